//! Line-at-a-time reads from a raw descriptor.

use hsu_common::Result;
use hsu_process::read_byte;
use std::os::unix::io::RawFd;

/// Read one line from `fd` into `buf` (cleared first), without the `\n`.
///
/// Bytes are consumed one at a time so nothing past the newline is taken
/// from the descriptor. Returns `false` only when end-of-stream is hit before
/// any byte; a final line without a terminator still returns `true`.
pub(crate) fn read_line_bytes(fd: RawFd, buf: &mut Vec<u8>) -> Result<bool> {
    buf.clear();
    let mut found = false;
    while let Some(byte) = read_byte(fd)? {
        found = true;
        if byte == b'\n' {
            break;
        }
        buf.push(byte);
    }
    Ok(found)
}
