//! Stream and redirection types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::os::unix::io::RawFd;
use std::path::PathBuf;

/// One of the three standard streams of a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdStream {
    Stdin,
    Stdout,
    Stderr,
}

impl StdStream {
    /// All streams in wiring order: input, output, error.
    pub const ALL: [StdStream; 3] = [StdStream::Stdin, StdStream::Stdout, StdStream::Stderr];

    /// The fixed descriptor slot this stream occupies in the child.
    pub fn fileno(self) -> RawFd {
        match self {
            StdStream::Stdin => 0,
            StdStream::Stdout => 1,
            StdStream::Stderr => 2,
        }
    }

    /// Whether the child reads from this stream (the parent writes to it).
    pub fn is_input(self) -> bool {
        self == StdStream::Stdin
    }
}

impl fmt::Display for StdStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StdStream::Stdin => write!(f, "stdin"),
            StdStream::Stdout => write!(f, "stdout"),
            StdStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// A stream the parent can read lines from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl From<OutputStream> for StdStream {
    fn from(stream: OutputStream) -> Self {
        match stream {
            OutputStream::Stdout => StdStream::Stdout,
            OutputStream::Stderr => StdStream::Stderr,
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        StdStream::from(*self).fmt(f)
    }
}

/// Where a child's standard stream is connected.
///
/// In configuration files a pipe is the bare word `pipe` and a file is a
/// `path:` map.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "RedirectRepr", into = "RedirectRepr")]
pub enum Redirect {
    /// A pipe; the parent keeps the other end.
    #[default]
    Pipe,
    /// A file on disk. The parent keeps nothing for this stream.
    Path(PathBuf),
}

impl Redirect {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Redirect::Path(path.into())
    }

    pub fn is_pipe(&self) -> bool {
        matches!(self, Redirect::Pipe)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RedirectKeyword {
    Pipe,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RedirectRepr {
    Keyword(RedirectKeyword),
    Path { path: PathBuf },
}

impl From<RedirectRepr> for Redirect {
    fn from(repr: RedirectRepr) -> Self {
        match repr {
            RedirectRepr::Keyword(RedirectKeyword::Pipe) => Redirect::Pipe,
            RedirectRepr::Path { path } => Redirect::Path(path),
        }
    }
}

impl From<Redirect> for RedirectRepr {
    fn from(redirect: Redirect) -> Self {
        match redirect {
            Redirect::Pipe => RedirectRepr::Keyword(RedirectKeyword::Pipe),
            Redirect::Path(path) => RedirectRepr::Path { path },
        }
    }
}

/// Per-stream redirection for a child. Every stream defaults to a pipe.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StdioConfig {
    pub stdin: Redirect,
    pub stdout: Redirect,
    pub stderr: Redirect,
}

impl StdioConfig {
    /// All three streams piped.
    pub fn piped() -> Self {
        Self::default()
    }

    pub fn get(&self, stream: StdStream) -> &Redirect {
        match stream {
            StdStream::Stdin => &self.stdin,
            StdStream::Stdout => &self.stdout,
            StdStream::Stderr => &self.stderr,
        }
    }

    /// Builder-style setter.
    pub fn with(mut self, stream: StdStream, redirect: Redirect) -> Self {
        match stream {
            StdStream::Stdin => self.stdin = redirect,
            StdStream::Stdout => self.stdout = redirect,
            StdStream::Stderr => self.stderr = redirect,
        }
        self
    }
}
