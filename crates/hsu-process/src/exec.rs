//! Program image replacement.

use hsu_common::{Error, Result};
use std::convert::Infallible;
use std::ffi::{CString, OsStr};
use std::fmt;
use std::os::unix::ffi::OsStrExt;

/// An executable path and its argument vector, ready for `execv`.
///
/// Built before fork so the child never allocates. `argv[0]` is the path
/// itself; the null terminator exists only in the pointer array handed to
/// the OS.
pub struct ExecProgram {
    path: CString,
    args: Vec<CString>,
    argv: Vec<*const libc::c_char>,
}

impl ExecProgram {
    /// Prepare `path` with `args` (not including `argv[0]`).
    pub fn new<P, I, S>(path: P, args: I) -> Result<Self>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let path = path.as_ref();
        if path.is_empty() {
            return Err(Error::invalid_argument("Executable path cannot be empty"));
        }
        let path = to_cstring(path)?;

        let mut owned = vec![path.clone()];
        for arg in args {
            owned.push(to_cstring(arg.as_ref())?);
        }

        // Pointers target the CStrings' heap buffers, which stay put when
        // the Vec holding them moves.
        let mut argv: Vec<*const libc::c_char> = owned.iter().map(|a| a.as_ptr()).collect();
        argv.push(std::ptr::null());

        Ok(Self {
            path,
            args: owned,
            argv,
        })
    }

    pub fn path(&self) -> &CString {
        &self.path
    }

    /// Full argument vector, `argv[0]` included.
    pub fn args(&self) -> &[CString] {
        &self.args
    }
}

impl fmt::Debug for ExecProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecProgram")
            .field("path", &self.path)
            .field("args", &self.args)
            .finish()
    }
}

fn to_cstring(value: &OsStr) -> Result<CString> {
    CString::new(value.as_bytes()).map_err(|_| {
        Error::invalid_argument(format!(
            "Argument contains a NUL byte: {}",
            value.to_string_lossy()
        ))
    })
}

/// Replace the calling process image with `program`.
///
/// Never returns on success. On failure the process is left in whatever
/// state it was in; a forked child must terminate immediately.
pub fn replace_and_exec(program: &ExecProgram) -> Result<Infallible> {
    // SAFETY: path and argv are valid NUL-terminated strings and argv is
    // null-terminated; all of them outlive the call.
    unsafe { libc::execv(program.path.as_ptr(), program.argv.as_ptr()) };
    Err(Error::last_os("execv"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_starts_with_path() {
        let program = ExecProgram::new("/bin/sh", ["-c", "echo oi"]).unwrap();
        let args: Vec<&str> = program.args().iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(args, vec!["/bin/sh", "-c", "echo oi"]);
        assert_eq!(program.path().to_str().unwrap(), "/bin/sh");
    }

    #[test]
    fn test_argv_is_null_terminated() {
        let program = ExecProgram::new("/bin/true", Vec::<String>::new()).unwrap();
        assert_eq!(program.argv.len(), 2);
        assert!(program.argv[1].is_null());
        assert_eq!(program.argv[0], program.args()[0].as_ptr());
    }

    #[test]
    fn test_rejects_empty_path() {
        let err = ExecProgram::new("", ["x"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_rejects_interior_nul() {
        let err = ExecProgram::new("/bin/echo", ["a\0b"]).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(err.to_string().contains("NUL"));
    }
}
