//! Forking a child that runs a single designated body.

use hsu_common::errors::OsResultExt;
use hsu_common::Result;
use nix::sys::signal::{SigHandler, SigSet, SigmaskHow, Signal};
use nix::unistd::{fork, ForkResult, Pid};
use std::panic::{self, AssertUnwindSafe};

/// Exit code of a child whose body returned instead of exec'ing.
pub const CHILD_FAILED_EXIT_CODE: i32 = 127;

/// Fork the calling process.
///
/// The parent gets the child's pid back. The child runs `body` and then
/// terminates with [`CHILD_FAILED_EXIT_CODE`]. It never returns into the
/// caller's code, not even if `body` panics.
///
/// `body` runs in a copy of a possibly multi-threaded process: it must stick
/// to async-signal-safe work on data prepared before the fork.
pub fn spawn_child<F>(body: F) -> Result<Pid>
where
    F: FnOnce(),
{
    // SAFETY: the child branch only runs `body` and `_exit`s.
    match unsafe { fork() }.os_context("fork")? {
        ForkResult::Parent { child } => Ok(child),
        ForkResult::Child => {
            let _ = panic::catch_unwind(AssertUnwindSafe(body));
            // SAFETY: _exit skips atexit handlers and stdio flushing that
            // belong to the parent.
            unsafe { libc::_exit(CHILD_FAILED_EXIT_CODE) }
        }
    }
}

/// Restore the signal state a freshly exec'd program expects: an empty mask
/// and default SIGPIPE handling (the Rust runtime ignores SIGPIPE, and an
/// ignored disposition survives exec).
pub fn reset_signal_state() -> Result<()> {
    nix::sys::signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None)
        .os_context("sigprocmask")?;
    // SAFETY: installing SIG_DFL runs no Rust code in signal context.
    unsafe { nix::sys::signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) }
        .os_context("signal")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::write_all;
    use crate::pipe::create_pipe;
    use crate::wait::wait_child;

    fn exit_code(raw: libc::c_int) -> Option<i32> {
        libc::WIFEXITED(raw).then(|| libc::WEXITSTATUS(raw))
    }

    #[test]
    fn test_child_exits_after_body_returns() {
        let pid = spawn_child(|| {}).unwrap();
        let raw = wait_child(pid, true).unwrap().unwrap();
        assert_eq!(exit_code(raw), Some(CHILD_FAILED_EXIT_CODE));
    }

    #[test]
    fn test_child_body_can_choose_exit_code() {
        let pid = spawn_child(|| unsafe { libc::_exit(7) }).unwrap();
        let raw = wait_child(pid, true).unwrap().unwrap();
        assert_eq!(exit_code(raw), Some(7));
    }

    #[test]
    fn test_reset_restores_default_sigpipe() {
        let pipe = create_pipe().unwrap();
        drop(pipe.read);
        let writer = pipe.write;

        let pid = spawn_child(|| {
            if reset_signal_state().is_ok() {
                let _ = write_all(&writer, b"x");
            }
            unsafe { libc::_exit(0) }
        })
        .unwrap();
        let raw = wait_child(pid, true).unwrap().unwrap();
        assert!(libc::WIFSIGNALED(raw));
        assert_eq!(libc::WTERMSIG(raw), libc::SIGPIPE);
    }

    #[test]
    fn test_panicking_body_still_exits() {
        let pid = spawn_child(|| panic!("boom")).unwrap();
        let raw = wait_child(pid, true).unwrap().unwrap();
        assert_eq!(exit_code(raw), Some(CHILD_FAILED_EXIT_CODE));
    }
}
