//! Error types for the HSU child-process crates.
//!
//! Every failing system call is reported as [`Error::Os`], carrying the name
//! of the operation and the errno it produced. A child that exits or dies from
//! a signal is *not* an error; that is status, see `hsu-process-state`.

use nix::errno::Errno;
use thiserror::Error;

use crate::types::StdStream;

/// Result type alias for HSU child-process operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A system call failed.
    #[error("{operation} failed: {errno}")]
    Os {
        operation: &'static str,
        errno: Errno,
    },

    /// Input that cannot be handed to the OS (e.g. an interior NUL byte).
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The stream has no parent-side endpoint (redirected or already closed).
    #[error("Stream not available: {stream}")]
    StreamUnavailable { stream: StdStream },
}

impl Error {
    /// Creates an OS error for `operation`.
    pub fn os(operation: &'static str, errno: Errno) -> Self {
        Self::Os { operation, errno }
    }

    /// Creates an OS error for `operation` from the calling thread's errno.
    pub fn last_os(operation: &'static str) -> Self {
        Self::os(operation, Errno::last())
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn stream_unavailable(stream: StdStream) -> Self {
        Self::StreamUnavailable { stream }
    }

    /// Name of the failing system call, if this is an OS error.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Os { operation, .. } => Some(operation),
            _ => None,
        }
    }

    /// The errno, if this is an OS error.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::Os { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}

/// Attaches an operation name to a raw `nix` result.
pub trait OsResultExt<T> {
    fn os_context(self, operation: &'static str) -> Result<T>;
}

impl<T> OsResultExt<T> for nix::Result<T> {
    fn os_context(self, operation: &'static str) -> Result<T> {
        self.map_err(|errno| Error::os(operation, errno))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_error_message() {
        let err = Error::os("pipe", Errno::EMFILE);
        let message = err.to_string();
        assert!(message.starts_with("pipe failed"));
        assert!(message.contains("EMFILE"));
    }

    #[test]
    fn test_os_error_accessors() {
        let err = Error::os("execv", Errno::ENOENT);
        assert_eq!(err.operation(), Some("execv"));
        assert_eq!(err.errno(), Some(Errno::ENOENT));

        let err = Error::invalid_argument("nul byte");
        assert_eq!(err.operation(), None);
        assert_eq!(err.errno(), None);
    }

    #[test]
    fn test_os_context() {
        let res: nix::Result<()> = Err(Errno::EBADF);
        match res.os_context("dup2") {
            Err(Error::Os { operation, errno }) => {
                assert_eq!(operation, "dup2");
                assert_eq!(errno, Errno::EBADF);
            }
            other => panic!("Wrong result: {:?}", other),
        }
    }

    #[test]
    fn test_stream_unavailable_message() {
        let err = Error::stream_unavailable(StdStream::Stdin);
        assert_eq!(err.to_string(), "Stream not available: stdin");
    }
}
