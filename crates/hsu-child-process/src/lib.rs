//! # HSU Child Process
//!
//! Spawn an external program, wire its standard streams to pipes or files,
//! read its output line by line and find out how it ended.
//!
//! ```rust,no_run
//! use hsu_child_process::{ChildProcess, ChildStatus, OutputStream};
//!
//! let mut child = ChildProcess::spawn("/bin/sh", ["-c", "echo oi"])?;
//! assert_eq!(child.wait()?, ChildStatus::Exited);
//!
//! while let Some(line) = child.read_line(OutputStream::Stdout)? {
//!     println!("{}", line);
//! }
//! # Ok::<(), hsu_child_process::Error>(())
//! ```
//!
//! **Architecture:**
//! ```text
//! ChildProcess (descriptor topology, status, line reads)
//!       ↓ uses
//! hsu-process (pipe / dup2 / fork / execv / waitpid wrappers)
//!       ↓ calls
//! kernel
//! ```
//!
//! Everything is synchronous: [`ChildProcess::wait`] and
//! [`ChildProcess::read_line`] block the calling thread.

mod child_plan;
pub mod config;
pub mod handle;
mod line_reader;

pub use config::SpawnConfig;
pub use handle::{ChildProcess, Lines};

pub use hsu_common::{Error, OutputStream, Redirect, Result, StdStream, StdioConfig};
pub use hsu_process_state::{ChildStatus, WaitStatus};
