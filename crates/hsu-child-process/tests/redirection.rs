//! Streams redirected to files instead of pipes.

mod common;

use common::{drain, init_logging};
use hsu_child_process::{
    ChildProcess, ChildStatus, OutputStream, Redirect, SpawnConfig, StdStream, StdioConfig,
};

#[test]
fn test_stdout_to_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let stdio = StdioConfig::piped().with(StdStream::Stdout, Redirect::path(&out));

    let mut child = ChildProcess::spawn_with("/bin/sh", ["-c", "echo to-file"], &stdio).unwrap();
    assert_eq!(child.raw_fd(StdStream::Stdout), None);
    assert_eq!(child.read_line(OutputStream::Stdout).unwrap(), None);

    assert_eq!(child.wait().unwrap(), ChildStatus::Exited);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "to-file\n");
}

#[test]
fn test_stdin_from_file() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    std::fs::write(&input, "alpha\nbeta\n").unwrap();
    let stdio = StdioConfig::piped().with(StdStream::Stdin, Redirect::path(&input));

    let mut child = ChildProcess::spawn_with("/bin/sh", ["-c", "cat"], &stdio).unwrap();
    assert_eq!(child.raw_fd(StdStream::Stdin), None);
    assert!(!child.close_stdin());
    assert!(child.write_stdin(b"x").is_err());

    assert_eq!(drain(&mut child, OutputStream::Stdout), vec!["alpha", "beta"]);
    child.wait().unwrap();
}

#[test]
fn test_stderr_to_file_keeps_stdout_piped() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let err_path = dir.path().join("err.txt");
    let stdio = StdioConfig::piped().with(StdStream::Stderr, Redirect::path(&err_path));

    let mut child =
        ChildProcess::spawn_with("/bin/sh", ["-c", "echo out; echo oops >&2"], &stdio).unwrap();
    assert_eq!(drain(&mut child, OutputStream::Stdout), vec!["out"]);
    assert_eq!(child.read_line(OutputStream::Stderr).unwrap(), None);
    child.wait().unwrap();
    assert_eq!(std::fs::read_to_string(&err_path).unwrap(), "oops\n");
}

#[test]
fn test_all_streams_redirected() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let out = dir.path().join("out.txt");
    let err = dir.path().join("err.txt");
    std::fs::write(&input, "payload\n").unwrap();

    let stdio = StdioConfig {
        stdin: Redirect::path(&input),
        stdout: Redirect::path(&out),
        stderr: Redirect::path(&err),
    };
    let mut child =
        ChildProcess::spawn_with("/bin/sh", ["-c", "cat; echo done >&2"], &stdio).unwrap();
    for stream in StdStream::ALL {
        assert_eq!(child.raw_fd(stream), None);
    }
    child.wait().unwrap();

    assert_eq!(std::fs::read_to_string(&out).unwrap(), "payload\n");
    assert_eq!(std::fs::read_to_string(&err).unwrap(), "done\n");
}

#[test]
fn test_missing_input_file_fails_before_fork() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let stdio =
        StdioConfig::piped().with(StdStream::Stdin, Redirect::path(dir.path().join("missing")));

    let err = ChildProcess::spawn_with("/bin/cat", Vec::<String>::new(), &stdio).unwrap_err();
    assert_eq!(err.operation(), Some("open"));
    assert_eq!(err.errno(), Some(nix::errno::Errno::ENOENT));
}

#[test]
fn test_spawn_from_yaml_config() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("yaml-out.txt");
    let yaml = format!(
        "executable: /bin/sh\nargs: [\"-c\", \"echo from-yaml\"]\nstdio:\n  stdout:\n    path: {}\n",
        out.display()
    );

    let config = SpawnConfig::load_from_string(&yaml).unwrap();
    let mut child = ChildProcess::from_config(&config).unwrap();
    assert_eq!(child.wait().unwrap(), ChildStatus::Exited);
    assert_eq!(std::fs::read_to_string(&out).unwrap(), "from-yaml\n");
}
