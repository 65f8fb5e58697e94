//! Descriptor primitives: duplicate, open, close, byte I/O.
//!
//! The functions used between fork and exec ([`duplicate`],
//! [`close_foreign_descriptors`]) avoid allocation on their primary path.

use hsu_common::errors::OsResultExt;
use hsu_common::{Error, Result};
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::sys::stat::Mode;
use std::os::unix::io::{AsFd, AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::Path;

/// First descriptor above the three standard streams.
pub const FIRST_FOREIGN_FD: RawFd = 3;

#[cfg(target_os = "linux")]
const FD_DIR: &str = "/proc/self/fd";
#[cfg(not(target_os = "linux"))]
const FD_DIR: &str = "/dev/fd";

/// How a redirection file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Read-only; the file must exist.
    Read,
    /// Write-only; created (0644) if missing and truncated.
    Write,
}

/// Make `new` refer to the same channel as `old`, closing whatever `new`
/// referred to before. The resulting `new` survives exec.
pub fn duplicate(old: RawFd, new: RawFd) -> Result<()> {
    if old == new {
        // dup2 is a no-op here and would leave close-on-exec set
        return fcntl(new, FcntlArg::F_SETFD(FdFlag::empty()))
            .map(drop)
            .os_context("dup2");
    }
    nix::unistd::dup2(old, new).map(drop).os_context("dup2")
}

/// Open `path` for use as a redirection target.
pub fn open_path(path: &Path, access: Access) -> Result<OwnedFd> {
    let (flags, mode) = match access {
        Access::Read => (OFlag::O_RDONLY, Mode::empty()),
        Access::Write => (
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            Mode::from_bits_truncate(0o644),
        ),
    };
    let fd = nix::fcntl::open(path, flags | OFlag::O_CLOEXEC, mode).os_context("open")?;
    // SAFETY: `open` just returned this descriptor and nothing else owns it.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// Set close-on-exec on `fd`.
pub fn set_cloexec(fd: &impl AsRawFd) -> Result<()> {
    fcntl(fd.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
        .map(drop)
        .os_context("fcntl")
}

/// Move `fd` above the standard slots if it currently occupies one.
///
/// Wiring a child dups its channels onto 0, 1 and 2 in order; a channel
/// already sitting on one of those slots could be clobbered before its own
/// turn.
pub fn raise_above_standard(fd: OwnedFd) -> Result<OwnedFd> {
    if fd.as_raw_fd() >= FIRST_FOREIGN_FD {
        return Ok(fd);
    }
    let raised = fcntl(fd.as_raw_fd(), FcntlArg::F_DUPFD_CLOEXEC(FIRST_FOREIGN_FD))
        .os_context("fcntl")?;
    // SAFETY: F_DUPFD_CLOEXEC returned a fresh descriptor we now own.
    Ok(unsafe { OwnedFd::from_raw_fd(raised) })
}

/// Close every descriptor above the standard three except those in `keep`.
///
/// Meant for the child between fork and exec. Prefers a bulk `close_range`
/// where the kernel offers it, falls back to enumerating the process's
/// descriptor directory, and as a last resort closes every number up to the
/// descriptor limit.
pub fn close_foreign_descriptors(keep: &[RawFd]) -> Result<()> {
    #[cfg(target_os = "linux")]
    {
        if close_ranges_except(keep).is_ok() {
            return Ok(());
        }
    }

    if close_listed_except(keep).is_err() {
        close_up_to_limit_except(keep);
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn close_ranges_except(keep: &[RawFd]) -> Result<()> {
    let mut low = FIRST_FOREIGN_FD as u32;
    loop {
        let next = keep
            .iter()
            .filter_map(|&fd| u32::try_from(fd).ok())
            .filter(|&fd| fd >= low)
            .min();
        let high = next.map_or(u32::MAX, |fd| fd.saturating_sub(1));
        if next != Some(low) && high >= low {
            close_range(low, high)?;
        }
        match next {
            Some(fd) if fd < u32::MAX => low = fd + 1,
            _ => return Ok(()),
        }
    }
}

#[cfg(target_os = "linux")]
fn close_range(first: u32, last: u32) -> Result<()> {
    // SAFETY: close_range only touches this process's descriptor table.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_close_range,
            first as libc::c_uint,
            last as libc::c_uint,
            0 as libc::c_uint,
        )
    };
    if rc == -1 {
        return Err(Error::last_os("close_range"));
    }
    Ok(())
}

fn close_listed_except(keep: &[RawFd]) -> Result<()> {
    use nix::dir::Dir;

    let mut dir = Dir::open(
        FD_DIR,
        OFlag::O_RDONLY | OFlag::O_DIRECTORY | OFlag::O_CLOEXEC,
        Mode::empty(),
    )
    .os_context("opendir")?;
    let dir_fd = dir.as_raw_fd();

    for entry in dir.iter() {
        let entry = entry.os_context("readdir")?;
        let Some(fd) = parse_fd(entry.file_name().to_bytes()) else {
            continue;
        };
        if fd < FIRST_FOREIGN_FD || fd == dir_fd || keep.contains(&fd) {
            continue;
        }
        let _ = nix::unistd::close(fd);
    }
    Ok(())
}

fn close_up_to_limit_except(keep: &[RawFd]) {
    // SAFETY: sysconf has no preconditions.
    let limit = unsafe { libc::sysconf(libc::_SC_OPEN_MAX) };
    let limit = if limit > 0 { limit.min(RawFd::MAX as libc::c_long) as RawFd } else { 1024 };
    for fd in FIRST_FOREIGN_FD..limit {
        if !keep.contains(&fd) {
            let _ = nix::unistd::close(fd);
        }
    }
}

fn parse_fd(name: &[u8]) -> Option<RawFd> {
    std::str::from_utf8(name).ok()?.parse().ok()
}

/// Read a single byte. `Ok(None)` means end-of-stream.
///
/// Blocks while the peer is open and no data is available. Interrupted
/// reads are retried.
pub fn read_byte(fd: RawFd) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match nix::unistd::read(fd, &mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(Error::os("read", errno)),
        }
    }
}

/// Write all of `bytes`, retrying short and interrupted writes.
pub fn write_all(fd: impl AsFd, mut bytes: &[u8]) -> Result<()> {
    let fd = fd.as_fd();
    while !bytes.is_empty() {
        match nix::unistd::write(fd, bytes) {
            Ok(0) => return Err(Error::os("write", Errno::EIO)),
            Ok(n) => bytes = &bytes[n..],
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(Error::os("write", errno)),
        }
    }
    Ok(())
}
