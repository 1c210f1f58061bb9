//! Bounded execution of external commands.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::debug;
use wait_timeout::ChildExt;

use crate::error::RunError;

/// Captured result of a command that exited on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `program` with `args`, killing it (SIGKILL) if it does not exit
/// within `timeout`.
///
/// stdout and stderr are drained on background threads so a chatty child
/// cannot block on a full pipe before it exits.
pub fn run_with_timeout(
    program: &Path,
    args: &[String],
    timeout: Duration,
) -> Result<CommandOutput, RunError> {
    let program_label = program.display().to_string();
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| match source.kind() {
            ErrorKind::NotFound => RunError::NotFound {
                program: program_label.clone(),
            },
            ErrorKind::PermissionDenied => RunError::PermissionDenied {
                program: program_label.clone(),
            },
            _ => RunError::Spawn {
                program: program_label.clone(),
                source,
            },
        })?;

    let stdout_thread = child.stdout.take().map(drain);
    let stderr_thread = child.stderr.take().map(drain);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            debug!(
                command = %program_label,
                ?args,
                timeout_ms = timeout.as_millis() as u64,
                "Command timed out, killing process"
            );
            let _ = child.kill();
            let _ = child.wait();
            collect(stdout_thread, &program_label, "stdout");
            collect(stderr_thread, &program_label, "stderr");
            return Err(RunError::TimedOut {
                program: program_label,
                timeout,
            });
        }
        Err(source) => {
            let _ = child.kill();
            let _ = child.wait();
            collect(stdout_thread, &program_label, "stdout");
            collect(stderr_thread, &program_label, "stderr");
            return Err(RunError::Wait {
                program: program_label,
                source,
            });
        }
    };

    let stdout = collect(stdout_thread, &program_label, "stdout");
    let stderr = collect(stderr_thread, &program_label, "stderr");

    Ok(CommandOutput {
        exit_code: status.code(),
        success: status.success(),
        stdout,
        stderr,
    })
}

type DrainHandle = JoinHandle<(Vec<u8>, std::io::Result<usize>)>;

fn drain<R: Read + Send + 'static>(mut pipe: R) -> DrainHandle {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let result = pipe.read_to_end(&mut buf);
        (buf, result)
    })
}

fn collect(handle: Option<DrainHandle>, program: &str, stream: &str) -> String {
    let buf = handle
        .and_then(|t| t.join().ok())
        .map(|(buf, res)| {
            if let Err(e) = res {
                debug!(command = %program, stream, error = %e, "Failed to read output");
            }
            buf
        })
        .unwrap_or_default();
    String::from_utf8_lossy(&buf).into_owned()
}
