//! Raw wait-status decoding and signal names.

use serde::{Deserialize, Serialize};
use std::ffi::CStr;
use std::fmt;

use crate::ChildStatus;

/// The status word reported by `waitpid`, kept undecoded until asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitStatus(libc::c_int);

impl WaitStatus {
    pub fn from_raw(raw: libc::c_int) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> libc::c_int {
        self.0
    }

    /// Terminal classification of this status.
    pub fn classify(self) -> ChildStatus {
        if libc::WIFEXITED(self.0) {
            ChildStatus::Exited
        } else if libc::WIFSIGNALED(self.0) {
            ChildStatus::Signaled
        } else {
            ChildStatus::Unknown
        }
    }

    /// Exit code (0-255) if the child exited normally.
    pub fn exit_code(self) -> Option<i32> {
        libc::WIFEXITED(self.0).then(|| libc::WEXITSTATUS(self.0))
    }

    /// Number of the signal that terminated the child.
    pub fn signal_number(self) -> Option<i32> {
        libc::WIFSIGNALED(self.0).then(|| libc::WTERMSIG(self.0))
    }

    pub fn core_dumped(self) -> bool {
        libc::WIFSIGNALED(self.0) && libc::WCOREDUMP(self.0)
    }
}

impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.exit_code(), self.signal_number()) {
            (Some(code), _) => write!(f, "exit code {}", code),
            (None, Some(signal)) => write!(f, "signal {}", signal),
            _ => write!(f, "raw status {:#x}", self.0),
        }
    }
}

/// Human-readable description of signal `signal`, e.g. "Terminated".
///
/// Returns `None` (and logs a warning) for numbers outside the known signal
/// table.
pub fn signal_name(signal: i32) -> Option<String> {
    if nix::sys::signal::Signal::try_from(signal).is_err() {
        tracing::warn!("Unknown signal number {}", signal);
        return None;
    }

    // SAFETY: strsignal returns a pointer to a NUL-terminated string (or
    // null) that stays valid until the next strsignal call on this thread;
    // it is copied out immediately.
    let description = unsafe { libc::strsignal(signal) };
    if description.is_null() {
        tracing::warn!("No description for signal {}", signal);
        return None;
    }
    let description = unsafe { CStr::from_ptr(description) }
        .to_string_lossy()
        .into_owned();
    Some(description)
}
