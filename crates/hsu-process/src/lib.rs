//! # HSU Process
//!
//! Low-level POSIX primitives for spawning and wiring a child process.
//!
//! This crate provides thin wrappers around:
//! - Pipe creation
//! - Descriptor duplication, opening and bulk closing
//! - Fork with a child-only body, and exec
//! - Waiting on a child and byte-level reads/writes
//!
//! Every wrapper reports failure as [`hsu_common::Error::Os`] carrying the
//! name of the failing call and its errno. Raw descriptor numbers and errno
//! handling stay in this crate; callers think in terms of channels and
//! processes.

#[cfg(not(unix))]
compile_error!("hsu-process supports Unix-like targets only");

pub mod descriptor;
pub mod exec;
pub mod pipe;
pub mod spawn;
pub mod wait;

// Re-export main types
pub use descriptor::*;
pub use exec::*;
pub use pipe::*;
pub use spawn::*;
pub use wait::*;
