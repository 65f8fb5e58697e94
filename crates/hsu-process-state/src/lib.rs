//! # HSU Process State
//!
//! Lifecycle state of a spawned child process.
//!
//! A child starts out [`ChildStatus::Running`] and moves exactly once to one
//! of the terminal states when its wait status is recorded. The raw status
//! word is kept so the exit code or terminating signal can be decoded on
//! demand.

pub mod wait_status;

pub use wait_status::{signal_name, WaitStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Child process status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChildStatus {
    /// Not yet reaped
    Running,
    /// Exited normally with a code
    Exited,
    /// Terminated by a signal
    Signaled,
    /// Reaped with a status that is neither an exit nor a signal
    Unknown,
}

impl fmt::Display for ChildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildStatus::Running => write!(f, "running"),
            ChildStatus::Exited => write!(f, "exited"),
            ChildStatus::Signaled => write!(f, "signaled"),
            ChildStatus::Unknown => write!(f, "unknown"),
        }
    }
}

impl ChildStatus {
    /// Check if the status can no longer change
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChildStatus::Running)
    }
}

/// Cached, monotonic status of one child.
#[derive(Debug, Clone)]
pub struct ChildStateMachine {
    pid: i32,
    status: ChildStatus,
    wait_status: Option<WaitStatus>,
    started_at: DateTime<Utc>,
    terminated_at: Option<DateTime<Utc>>,
}

impl ChildStateMachine {
    /// Create the state for a freshly forked child.
    pub fn new(pid: i32) -> Self {
        Self {
            pid,
            status: ChildStatus::Running,
            wait_status: None,
            started_at: Utc::now(),
            terminated_at: None,
        }
    }

    pub fn current(&self) -> ChildStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// The recorded wait status, once terminal.
    pub fn wait_status(&self) -> Option<WaitStatus> {
        self.wait_status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn terminated_at(&self) -> Option<DateTime<Utc>> {
        self.terminated_at
    }

    /// Time from spawn to termination, or to now while running.
    pub fn lifetime(&self) -> chrono::Duration {
        self.terminated_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Record the status reported by the kernel for this child.
    ///
    /// The first call decides the terminal state. Later calls leave it
    /// unchanged and return the cached value.
    pub fn record(&mut self, wait_status: WaitStatus) -> ChildStatus {
        if self.is_terminal() {
            tracing::debug!(
                "Child {} already {}; ignoring status {}",
                self.pid,
                self.status,
                wait_status
            );
            return self.status;
        }

        self.status = wait_status.classify();
        self.wait_status = Some(wait_status);
        self.terminated_at = Some(Utc::now());

        tracing::debug!(
            "Child {} transitioned from running to {} ({})",
            self.pid,
            self.status,
            wait_status
        );
        self.status
    }

    /// Exit code, only when the child exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            ChildStatus::Exited => self.wait_status.and_then(WaitStatus::exit_code),
            _ => None,
        }
    }

    /// Terminating signal number, only when the child was signaled.
    pub fn signal_number(&self) -> Option<i32> {
        match self.status {
            ChildStatus::Signaled => self.wait_status.and_then(WaitStatus::signal_number),
            _ => None,
        }
    }

    /// Description of the terminating signal, only when the child was
    /// signaled and the signal is known.
    pub fn signal_name(&self) -> Option<String> {
        self.signal_number().and_then(signal_name)
    }
}
