//! Pipe creation.

use hsu_common::errors::OsResultExt;
use hsu_common::Result;
use std::os::unix::io::OwnedFd;

/// Both ends of a unidirectional byte channel.
///
/// Each end is close-on-exec; a child only keeps an end that was explicitly
/// duplicated onto one of its standard slots.
#[derive(Debug)]
pub struct Pipe {
    pub read: OwnedFd,
    pub write: OwnedFd,
}

/// Create a pipe.
#[cfg(not(any(target_os = "macos", target_os = "ios")))]
pub fn create_pipe() -> Result<Pipe> {
    use nix::fcntl::OFlag;

    let (read, write) = nix::unistd::pipe2(OFlag::O_CLOEXEC).os_context("pipe")?;
    Ok(Pipe { read, write })
}

/// Create a pipe.
#[cfg(any(target_os = "macos", target_os = "ios"))]
pub fn create_pipe() -> Result<Pipe> {
    let (read, write) = nix::unistd::pipe().os_context("pipe")?;
    crate::descriptor::set_cloexec(&read)?;
    crate::descriptor::set_cloexec(&write)?;
    Ok(Pipe { read, write })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{read_byte, write_all};
    use std::os::unix::io::AsRawFd;

    #[test]
    fn test_pipe_carries_bytes() {
        let pipe = create_pipe().unwrap();
        write_all(&pipe.write, b"ok").unwrap();
        drop(pipe.write);

        let fd = pipe.read.as_raw_fd();
        assert_eq!(read_byte(fd).unwrap(), Some(b'o'));
        assert_eq!(read_byte(fd).unwrap(), Some(b'k'));
        assert_eq!(read_byte(fd).unwrap(), None);
    }

    #[test]
    fn test_pipe_ends_are_cloexec() {
        use nix::fcntl::{fcntl, FcntlArg, FdFlag};

        let pipe = create_pipe().unwrap();
        for fd in [pipe.read.as_raw_fd(), pipe.write.as_raw_fd()] {
            let flags = fcntl(fd, FcntlArg::F_GETFD).unwrap();
            assert!(FdFlag::from_bits_truncate(flags).contains(FdFlag::FD_CLOEXEC));
        }
    }
}
