// Shared helpers for the child-process integration tests.

#![allow(dead_code)]

use hsu_child_process::{ChildProcess, OutputStream};

/// Route `tracing` output through the test harness.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Spawn `/bin/sh -c script` with every stream piped.
pub fn sh(script: &str) -> ChildProcess {
    init_logging();
    ChildProcess::spawn("/bin/sh", ["-c", script]).expect("Failed to spawn /bin/sh")
}

/// Drain `stream` to end-of-stream.
pub fn drain(child: &mut ChildProcess, stream: OutputStream) -> Vec<String> {
    child
        .lines(stream)
        .collect::<Result<Vec<_>, _>>()
        .expect("Failed to read child output")
}
