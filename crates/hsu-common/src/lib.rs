//! # HSU Common
//!
//! Common types shared by the HSU child-process crates.
//!
//! This crate provides the error type every layer reports through and the
//! small vocabulary used to describe a child's standard streams and how each
//! one is wired.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, Result};
pub use types::{OutputStream, Redirect, StdStream, StdioConfig};
