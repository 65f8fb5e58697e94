//! Waiting on a child process.

use hsu_common::{Error, Result};
use nix::errno::Errno;
use nix::unistd::Pid;

/// Wait for `pid` to terminate.
///
/// With `block == false` this returns `Ok(None)` immediately if the child is
/// still alive. Otherwise it returns the raw wait-status word, which the
/// caller decodes. Interrupted waits are retried.
pub fn wait_child(pid: Pid, block: bool) -> Result<Option<libc::c_int>> {
    let options = if block { 0 } else { libc::WNOHANG };
    loop {
        let mut status: libc::c_int = 0;
        // SAFETY: `status` is a valid out-pointer for the duration of the call.
        let rc = unsafe { libc::waitpid(pid.as_raw(), &mut status, options) };
        match Errno::result(rc) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(status)),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(Error::os("waitpid", errno)),
        }
    }
}
