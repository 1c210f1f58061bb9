//! One refresh cycle: list, parse, enrich, publish.
//!
//! The listing must finish before the batched argument lookup starts because
//! the lookup needs the pid set. Working-directory lookups are independent
//! per pid and run on a small rayon pool, each bounded by its own timeout.
//! Only a failed listing fails the cycle; lookup failures leave `args` or
//! `cwd` absent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use portscope_core::enrich::{merge_args, parse_args_output, parse_cwd_output};
use portscope_core::{Process, Snapshot, parse_listing};
use tracing::{debug, info, warn};

use crate::error::{CollectError, Result};
use crate::source::InventorySource;
use crate::store::SnapshotStore;

/// Upper bound on concurrent working-directory lookups.
const MAX_CWD_JOBS: usize = 8;

/// Optional refresh behaviour.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshOptions {
    /// Resolve each process's working directory.
    pub resolve_cwd: bool,
    /// Concurrent cwd lookups (`None` = adaptive default).
    pub cwd_jobs: Option<usize>,
}

/// Runs refresh cycles against one source.
///
/// A refresher is not reentrant: while one `refresh` is running, another
/// call on the same refresher returns [`CollectError::RefreshInProgress`].
pub struct Refresher<S> {
    source: S,
    options: RefreshOptions,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: InventorySource> Refresher<S> {
    pub fn new(source: S, options: RefreshOptions) -> Self {
        Self {
            source,
            options,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Builds a fresh snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::SourceUnavailable`] when the listing cannot
    /// be produced and [`CollectError::RefreshInProgress`] when another
    /// refresh is running.
    pub fn refresh(&self) -> Result<Snapshot> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(CollectError::RefreshInProgress);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let captured_at = Utc::now().to_rfc3339();
        let text = self.source.list_sockets()?;

        let listing = parse_listing(&text);
        let mut warnings = Vec::new();
        for issue in &listing.issues {
            debug!(issue = %issue, "Skipping malformed listing record");
            warnings.push(issue.to_string());
        }
        let mut processes = listing.processes;

        self.enrich_args(&mut processes, &mut warnings);
        if self.options.resolve_cwd {
            self.enrich_cwd(&mut processes);
        }

        let snapshot = Snapshot {
            captured_at,
            processes,
            warnings,
        };
        info!(
            processes = snapshot.processes.len(),
            connections = snapshot.connection_count(),
            warnings = snapshot.warnings.len(),
            "Socket inventory refreshed"
        );
        Ok(snapshot)
    }

    /// Builds a fresh snapshot and publishes it to `store`.
    ///
    /// On failure the store is left untouched, so its consumers keep the
    /// previous snapshot.
    pub fn refresh_into(&self, store: &dyn SnapshotStore) -> Result<Arc<Snapshot>> {
        let snapshot = Arc::new(self.refresh()?);
        store.put(snapshot.clone())?;
        Ok(snapshot)
    }

    fn enrich_args(&self, processes: &mut [Process], warnings: &mut Vec<String>) {
        let pids: Vec<u32> = processes.iter().map(|p| p.pid).collect();
        if pids.is_empty() {
            return;
        }

        let args = match self.source.lookup_args(&pids) {
            Ok(output) => parse_args_output(&output),
            Err(e) => {
                warn!(error = %e, pids = pids.len(), "Argument lookup failed");
                warnings.push(format!("argument lookup failed: {e}"));
                return;
            }
        };
        merge_args(processes, &args);

        let missing = processes.iter().filter(|p| p.args.is_none()).count();
        if missing > 0 {
            debug!(missing, "Processes exited before their arguments were read");
        }
    }

    fn enrich_cwd(&self, processes: &mut [Process]) {
        use rayon::prelude::*;

        let lookup = |proc: &mut Process| {
            proc.cwd = match self.source.lookup_cwd(proc.pid) {
                Ok(output) => parse_cwd_output(&output, proc.pid),
                Err(e) => {
                    debug!(pid = proc.pid, error = %e, "Working directory lookup failed");
                    None
                }
            };
        };

        let jobs = self
            .options
            .cwd_jobs
            .filter(|jobs| *jobs > 0)
            .unwrap_or_else(|| default_cwd_jobs(processes.len()));
        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(|| processes.par_iter_mut().for_each(lookup)),
            Err(e) => {
                warn!(error = %e, "Falling back to sequential cwd lookups");
                processes.iter_mut().for_each(lookup);
            }
        }
    }
}

fn default_cwd_jobs(process_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    cpu_count.min(MAX_CWD_JOBS).min(process_count.max(1))
}
