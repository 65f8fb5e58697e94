//! The process handle: one spawned child and the parent's ends of its
//! standard streams.

use chrono::{DateTime, Utc};
use hsu_common::{Error, OutputStream, Redirect, Result, StdStream, StdioConfig};
use hsu_process::{
    create_pipe, open_path, raise_above_standard, spawn_child, wait_child, write_all, Access,
    ExecProgram,
};
use hsu_process_state::{ChildStateMachine, ChildStatus, WaitStatus};
use nix::unistd::Pid;
use std::ffi::OsStr;
use std::os::unix::io::{AsRawFd, OwnedFd, RawFd};
use tracing::{debug, warn};

use crate::child_plan::{read_exec_report, ChildPlan};
use crate::config::SpawnConfig;
use crate::line_reader::read_line_bytes;

/// A running (or finished) child process.
///
/// The handle exclusively owns the parent-side descriptor of every piped
/// stream; streams redirected to a file have none. Dropping the handle closes
/// those descriptors but does not kill the child.
#[derive(Debug)]
pub struct ChildProcess {
    pid: Pid,
    program: String,
    stdin: Option<OwnedFd>,
    stdout: Option<OwnedFd>,
    stderr: Option<OwnedFd>,
    state: ChildStateMachine,
}

/// Both ends of one stream before the fork.
struct Channel {
    /// Kept by the parent (pipes only).
    parent: Option<OwnedFd>,
    /// Duplicated onto the child's standard slot, then dropped by the parent.
    child: OwnedFd,
}

impl Channel {
    fn open(stream: StdStream, redirect: &Redirect) -> Result<Self> {
        let (parent, child) = match redirect {
            Redirect::Pipe => {
                let pipe = create_pipe()?;
                if stream.is_input() {
                    (Some(pipe.write), pipe.read)
                } else {
                    (Some(pipe.read), pipe.write)
                }
            }
            Redirect::Path(path) => {
                let access = if stream.is_input() {
                    Access::Read
                } else {
                    Access::Write
                };
                (None, open_path(path, access)?)
            }
        };
        Ok(Self {
            parent,
            child: raise_above_standard(child)?,
        })
    }
}

impl ChildProcess {
    /// Spawn `path` with `args` (not including `argv[0]`), all three streams
    /// piped.
    pub fn spawn<P, I, S>(path: P, args: I) -> Result<Self>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        Self::spawn_with(path, args, &StdioConfig::piped())
    }

    /// Spawn from a [`SpawnConfig`].
    pub fn from_config(config: &SpawnConfig) -> Result<Self> {
        Self::spawn_with(&config.executable, &config.args, &config.stdio)
    }

    /// Spawn `path` with `args` and per-stream redirection.
    ///
    /// Fails with [`Error::Os`] if any pipe, open or fork fails, or if the
    /// child could not be wired up or exec'd (e.g. `execv` with `ENOENT` for
    /// a missing executable). On failure every descriptor opened so far is
    /// closed and a child that did get forked is reaped.
    pub fn spawn_with<P, I, S>(path: P, args: I, stdio: &StdioConfig) -> Result<Self>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let program = ExecProgram::new(path.as_ref(), args)?;
        let display_name = path.as_ref().to_string_lossy().into_owned();

        let [stdin, stdout, stderr] = [
            Channel::open(StdStream::Stdin, &stdio.stdin)?,
            Channel::open(StdStream::Stdout, &stdio.stdout)?,
            Channel::open(StdStream::Stderr, &stdio.stderr)?,
        ];
        let report = create_pipe()?;
        let report_write = raise_above_standard(report.write)?;

        let plan = ChildPlan::new(
            &program,
            [
                stdin.child.as_raw_fd(),
                stdout.child.as_raw_fd(),
                stderr.child.as_raw_fd(),
            ],
            report_write.as_raw_fd(),
        );
        let pid = spawn_child(|| plan.run())?;

        // The child holds its own copies now.
        drop(stdin.child);
        drop(stdout.child);
        drop(stderr.child);
        drop(report_write);

        confirm_exec(pid, report.read.as_raw_fd(), &display_name)?;

        debug!("Spawned {} as child {}", display_name, pid);
        Ok(Self {
            pid,
            program: display_name,
            stdin: stdin.parent,
            stdout: stdout.parent,
            stderr: stderr.parent,
            state: ChildStateMachine::new(pid.as_raw()),
        })
    }

    /// Process ID of the child.
    pub fn pid(&self) -> u32 {
        self.pid.as_raw() as u32
    }

    /// Executable path the child was started with.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Query the child's status, blocking until it terminates if `block`.
    ///
    /// Once terminal, the cached status is returned without a syscall.
    pub fn status(&mut self, block: bool) -> Result<ChildStatus> {
        if self.state.is_terminal() {
            return Ok(self.state.current());
        }
        match wait_child(self.pid, block)? {
            Some(raw) => Ok(self.state.record(WaitStatus::from_raw(raw))),
            None => Ok(ChildStatus::Running),
        }
    }

    pub fn is_running(&mut self) -> Result<bool> {
        Ok(self.status(false)? == ChildStatus::Running)
    }

    /// Block until the child terminates.
    pub fn wait(&mut self) -> Result<ChildStatus> {
        self.status(true)
    }

    /// Exit code (0-255) if the child exited normally, `None` otherwise
    /// (still running, signaled, or unknown).
    pub fn exit_code(&mut self) -> Result<Option<i32>> {
        self.refresh()?;
        Ok(self.state.exit_code())
    }

    /// Description of the terminating signal (e.g. "Terminated") if the
    /// child was killed by a known signal, `None` otherwise.
    pub fn signal_name(&mut self) -> Result<Option<String>> {
        self.refresh()?;
        Ok(self.state.signal_name())
    }

    /// Number of the terminating signal if the child was signaled.
    pub fn signal_number(&mut self) -> Result<Option<i32>> {
        self.refresh()?;
        Ok(self.state.signal_number())
    }

    /// The raw wait status, once the child has been reaped.
    pub fn wait_status(&self) -> Option<WaitStatus> {
        self.state.wait_status()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.state.started_at()
    }

    pub fn terminated_at(&self) -> Option<DateTime<Utc>> {
        self.state.terminated_at()
    }

    fn refresh(&mut self) -> Result<()> {
        if !self.state.is_terminal() {
            self.status(false)?;
        }
        Ok(())
    }

    /// Read the next line from `stream`, without its `\n`.
    ///
    /// Blocks while no data is available and the child keeps the stream
    /// open. Returns `None` at end-of-stream, and immediately if the stream
    /// has no parent-side descriptor. Invalid UTF-8 is replaced.
    pub fn read_line(&mut self, stream: OutputStream) -> Result<Option<String>> {
        let mut line = String::new();
        Ok(self.read_line_into(stream, &mut line)?.then_some(line))
    }

    /// Like [`read_line`](Self::read_line), into a caller-owned buffer.
    ///
    /// `line` is cleared first. Returns `false` at end-of-stream.
    pub fn read_line_into(&mut self, stream: OutputStream, line: &mut String) -> Result<bool> {
        line.clear();
        let Some(fd) = self.raw_fd(stream.into()) else {
            return Ok(false);
        };
        let mut bytes = Vec::new();
        if !read_line_bytes(fd, &mut bytes)? {
            return Ok(false);
        }
        line.push_str(&String::from_utf8_lossy(&bytes));
        Ok(true)
    }

    /// Iterate over the remaining lines of `stream`.
    pub fn lines(&mut self, stream: OutputStream) -> Lines<'_> {
        Lines {
            child: self,
            stream,
            done: false,
        }
    }

    /// Write all of `bytes` to the child's stdin.
    pub fn write_stdin(&mut self, bytes: &[u8]) -> Result<()> {
        let fd = self
            .stdin
            .as_ref()
            .ok_or_else(|| Error::stream_unavailable(StdStream::Stdin))?;
        write_all(fd, bytes)
    }

    /// Close the parent's end of stdin so the child sees end-of-stream.
    pub fn close_stdin(&mut self) -> bool {
        self.close_stream(StdStream::Stdin)
    }

    /// Close the parent's descriptor for `stream`. Returns whether there was
    /// one to close.
    pub fn close_stream(&mut self, stream: StdStream) -> bool {
        let closed = self.endpoint_mut(stream).take().is_some();
        if closed {
            debug!("Closed {} of child {}", stream, self.pid);
        }
        closed
    }

    /// Raw parent-side descriptor for `stream`, if one is retained.
    pub fn raw_fd(&self, stream: StdStream) -> Option<RawFd> {
        let endpoint = match stream {
            StdStream::Stdin => &self.stdin,
            StdStream::Stdout => &self.stdout,
            StdStream::Stderr => &self.stderr,
        };
        endpoint.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn endpoint_mut(&mut self, stream: StdStream) -> &mut Option<OwnedFd> {
        match stream {
            StdStream::Stdin => &mut self.stdin,
            StdStream::Stdout => &mut self.stdout,
            StdStream::Stderr => &mut self.stderr,
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        for stream in StdStream::ALL {
            self.endpoint_mut(stream).take();
        }

        // One non-blocking reap attempt; a child that is still running is
        // left alone.
        if !self.state.is_terminal() {
            match wait_child(self.pid, false) {
                Ok(Some(raw)) => {
                    self.state.record(WaitStatus::from_raw(raw));
                }
                Ok(None) => debug!(
                    "Child {} ({}) still running after its handle was dropped",
                    self.pid, self.program
                ),
                Err(e) => debug!("Could not reap child {}: {}", self.pid, e),
            }
        }
        debug!("Released handle for child {} ({})", self.pid, self.state.current());
    }
}

/// Iterator over the lines of one output stream. See [`ChildProcess::lines`].
pub struct Lines<'a> {
    child: &'a mut ChildProcess,
    stream: OutputStream,
    done: bool,
}

impl Iterator for Lines<'_> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.child.read_line(self.stream) {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Wait for the child's exec report. On any failure, including one reading
/// the report itself, the child is reaped before the error is returned.
fn confirm_exec(pid: Pid, report_fd: RawFd, display_name: &str) -> Result<()> {
    let err = match read_exec_report(report_fd) {
        Ok(None) => return Ok(()),
        Ok(Some(err)) | Err(err) => err,
    };
    debug!("Child {} for {} failed to start: {}", pid, display_name, err);
    if let Err(wait_err) = wait_child(pid, true) {
        warn!("Failed to reap child {}: {}", pid, wait_err);
    }
    Err(err)
}
