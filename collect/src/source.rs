//! Raw data sources for the socket inventory.
//!
//! [`InventorySource`] is the seam between the refresh pipeline and the
//! operating system. [`SystemSource`] shells out to `lsof` and `ps`; tests
//! substitute canned text.

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::error::{CollectError, Result, RunError};
use crate::runner::run_with_timeout;

/// Default timeout for the socket listing and the batched `ps` lookup
/// (milliseconds).
pub const DEFAULT_LISTING_TIMEOUT_MS: u64 = 5000;

/// Default timeout for one working-directory lookup (milliseconds).
pub const DEFAULT_CWD_TIMEOUT_MS: u64 = 1000;

/// `lsof` field selection: command, protocol, name, pid, login, TCP info.
const LISTING_FIELDS: &str = "cPnpLT";

/// Provider of raw listing text.
pub trait InventorySource: Send + Sync {
    /// Returns the complete `lsof -F` output for all Internet sockets.
    fn list_sockets(&self) -> Result<String>;

    /// Returns `<pid> <command line>` lines for every resolvable pid, in
    /// one call.
    fn lookup_args(&self, pids: &[u32]) -> Result<String>;

    /// Returns `lsof -F n` output describing the cwd of `pid`.
    fn lookup_cwd(&self, pid: u32) -> Result<String>;
}

/// Tool locations and timeouts for [`SystemSource`].
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub lsof_path: PathBuf,
    pub ps_path: PathBuf,
    pub listing_timeout: Duration,
    pub cwd_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            lsof_path: PathBuf::from("lsof"),
            ps_path: PathBuf::from("ps"),
            listing_timeout: Duration::from_millis(DEFAULT_LISTING_TIMEOUT_MS),
            cwd_timeout: Duration::from_millis(DEFAULT_CWD_TIMEOUT_MS),
        }
    }
}

/// Source backed by the local `lsof` and `ps` binaries.
#[derive(Debug, Clone, Default)]
pub struct SystemSource {
    config: SourceConfig,
}

impl SystemSource {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

/// Arguments for the socket listing call.
pub fn listing_args() -> Vec<String> {
    ["-i", "-P", "-n", "-F", LISTING_FIELDS]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Arguments for the batched command-line lookup.
pub fn args_lookup_args(pids: &[u32]) -> Vec<String> {
    let pid_list = pids
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",");
    vec![
        "-o".to_string(),
        "pid=".to_string(),
        "-o".to_string(),
        "command=".to_string(),
        "-p".to_string(),
        pid_list,
    ]
}

/// Arguments for one working-directory lookup.
pub fn cwd_lookup_args(pid: u32) -> Vec<String> {
    vec![
        "-a".to_string(),
        "-p".to_string(),
        pid.to_string(),
        "-d".to_string(),
        "cwd".to_string(),
        "-F".to_string(),
        "n".to_string(),
    ]
}

impl InventorySource for SystemSource {
    fn list_sockets(&self) -> Result<String> {
        let program = &self.config.lsof_path;
        let output = run_with_timeout(program, &listing_args(), self.config.listing_timeout)
            .map_err(|e| CollectError::SourceUnavailable(e.to_string()))?;

        if output.success || !output.stdout.trim().is_empty() {
            return Ok(output.stdout);
        }

        // lsof exits 1 without output when there are no sockets to report.
        let stderr = output.stderr.trim();
        if stderr.is_empty() {
            debug!(exit_code = ?output.exit_code, "Socket listing returned no sockets");
            return Ok(String::new());
        }
        Err(CollectError::SourceUnavailable(format!(
            "{} exited with {}: {stderr}",
            program.display(),
            output
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string())
        )))
    }

    fn lookup_args(&self, pids: &[u32]) -> Result<String> {
        if pids.is_empty() {
            return Ok(String::new());
        }
        // ps exits non-zero when some pids are gone; the rest are still
        // printed.
        let output = run_with_timeout(
            &self.config.ps_path,
            &args_lookup_args(pids),
            self.config.listing_timeout,
        )
        .map_err(lookup_failed)?;
        Ok(output.stdout)
    }

    fn lookup_cwd(&self, pid: u32) -> Result<String> {
        let output = run_with_timeout(
            &self.config.lsof_path,
            &cwd_lookup_args(pid),
            self.config.cwd_timeout,
        )
        .map_err(lookup_failed)?;
        Ok(output.stdout)
    }
}

fn lookup_failed(error: RunError) -> CollectError {
    CollectError::LookupFailed(error.to_string())
}
