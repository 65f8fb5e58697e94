//! What the forked child does before it becomes the target program.

use hsu_common::{Error, Result};
use hsu_process::{
    close_foreign_descriptors, duplicate, read_byte, replace_and_exec, reset_signal_state,
    write_all, ExecProgram,
};
use nix::errno::Errno;
use std::convert::Infallible;
use std::os::unix::io::{BorrowedFd, RawFd};

/// Operations whose failure the child can report, indexed by wire code.
const REPORTED_OPERATIONS: [&str; 8] = [
    "sigprocmask",
    "signal",
    "dup2",
    "fcntl",
    "close_range",
    "opendir",
    "readdir",
    "execv",
];

const REPORT_LEN: usize = 8;

/// Descriptor wiring and program for the child branch of a fork.
///
/// Everything here is prepared in the parent. The child only issues
/// descriptor syscalls against it, then execs or reports why it could not.
pub(crate) struct ChildPlan<'a> {
    program: &'a ExecProgram,
    /// Child-facing descriptors for stdin, stdout and stderr, in slot order.
    stdio: [RawFd; 3],
    /// Write end of the close-on-exec failure report pipe.
    report_fd: RawFd,
}

impl<'a> ChildPlan<'a> {
    pub(crate) fn new(program: &'a ExecProgram, stdio: [RawFd; 3], report_fd: RawFd) -> Self {
        Self {
            program,
            stdio,
            report_fd,
        }
    }

    /// Child side only. Returns only if wiring or exec failed, after the
    /// failure has been written to the report pipe.
    pub(crate) fn run(&self) {
        let err = match self.wire_and_exec() {
            Ok(never) => match never {},
            Err(err) => err,
        };
        let report = encode_failure(&err);
        // SAFETY: report_fd stays open in the child until exec or exit.
        let report_fd = unsafe { BorrowedFd::borrow_raw(self.report_fd) };
        let _ = write_all(report_fd, &report);
    }

    fn wire_and_exec(&self) -> Result<Infallible> {
        reset_signal_state()?;
        for (slot, &fd) in self.stdio.iter().enumerate() {
            duplicate(fd, slot as RawFd)?;
        }
        close_foreign_descriptors(&[self.report_fd])?;
        replace_and_exec(self.program)
    }
}

fn encode_failure(err: &Error) -> [u8; REPORT_LEN] {
    let operation = err.operation().unwrap_or("execv");
    let code = REPORTED_OPERATIONS
        .iter()
        .position(|op| *op == operation)
        .unwrap_or(REPORTED_OPERATIONS.len() - 1) as u32;
    let errno = err.errno().map_or(0, |errno| errno as i32);

    let mut report = [0u8; REPORT_LEN];
    report[..4].copy_from_slice(&code.to_be_bytes());
    report[4..].copy_from_slice(&errno.to_be_bytes());
    report
}

fn decode_failure(report: &[u8; REPORT_LEN]) -> Error {
    let code = u32::from_be_bytes([report[0], report[1], report[2], report[3]]);
    let errno = i32::from_be_bytes([report[4], report[5], report[6], report[7]]);
    let operation = REPORTED_OPERATIONS
        .get(code as usize)
        .copied()
        .unwrap_or("execv");
    Error::os(operation, Errno::from_raw(errno))
}

/// Parent side: read what the child reported.
///
/// End-of-stream with no bytes means the report pipe was closed by a
/// successful exec. The caller must have dropped its own copy of the write
/// end first.
pub(crate) fn read_exec_report(fd: RawFd) -> Result<Option<Error>> {
    let mut report = [0u8; REPORT_LEN];
    let mut len = 0;
    while len < REPORT_LEN {
        match read_byte(fd)? {
            Some(byte) => {
                report[len] = byte;
                len += 1;
            }
            None => break,
        }
    }

    match len {
        0 => Ok(None),
        REPORT_LEN => Ok(Some(decode_failure(&report))),
        _ => Ok(Some(Error::os("execv", Errno::EIO))),
    }
}
