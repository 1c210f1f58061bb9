//! Process termination.
//!
//! Signalling is a capability handed to the caller; nothing in the refresh
//! pipeline sends signals.

use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::{CollectError, Result};
use crate::runner::run_with_timeout;

const KILL_TIMEOUT: Duration = Duration::from_secs(2);

/// Signals the caller may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum Signal {
    /// Polite termination (SIGTERM).
    #[default]
    Term,
    /// Forced termination (SIGKILL).
    Kill,
}

impl Signal {
    /// `kill(1)` flag for this signal.
    pub fn flag(self) -> &'static str {
        match self {
            Self::Term => "-TERM",
            Self::Kill => "-KILL",
        }
    }
}

/// Sends signals to processes.
pub trait ProcessSignaller: Send + Sync {
    fn send(&self, pid: u32, signal: Signal) -> Result<()>;
}

/// Signaller backed by the system `kill` binary.
#[derive(Debug, Clone)]
pub struct SystemSignaller {
    kill_path: PathBuf,
}

impl Default for SystemSignaller {
    fn default() -> Self {
        Self {
            kill_path: PathBuf::from("kill"),
        }
    }
}

impl SystemSignaller {
    pub fn new(kill_path: PathBuf) -> Self {
        Self { kill_path }
    }
}

impl ProcessSignaller for SystemSignaller {
    fn send(&self, pid: u32, signal: Signal) -> Result<()> {
        if pid == 0 {
            return Err(CollectError::Signal {
                pid,
                reason: "refusing to signal pid 0".to_string(),
            });
        }

        let args = vec![signal.flag().to_string(), pid.to_string()];
        let output =
            run_with_timeout(&self.kill_path, &args, KILL_TIMEOUT).map_err(|e| {
                CollectError::Signal {
                    pid,
                    reason: e.to_string(),
                }
            })?;

        if !output.success {
            let stderr = output.stderr.trim();
            return Err(CollectError::Signal {
                pid,
                reason: if stderr.is_empty() {
                    format!("kill exited with {:?}", output.exit_code)
                } else {
                    stderr.to_string()
                },
            });
        }

        info!(pid, signal = ?signal, "Signal sent");
        Ok(())
    }
}
