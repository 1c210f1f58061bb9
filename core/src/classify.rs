//! Process grouping for presentation.
//!
//! Processes whose short command equals the tracked runtime (`node` by
//! default) are split into shown and hidden by the hide-list. Every other
//! process is sorted by traffic locality: only listening sockets, or only
//! connected ones. A process with both kinds, or with no sockets, belongs
//! to neither locality bucket but stays in the snapshot.

use serde::{Deserialize, Serialize};

use crate::Process;
use crate::format::LABEL_SEPARATOR;

/// Default tracked runtime command.
pub const DEFAULT_TRACKED_COMMAND: &str = "node";

/// Ports left out of the title by default.
pub const DEFAULT_TITLE_EXCLUDED_PORTS: &[&str] = &["80", "443"];

/// Classification inputs supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyOptions {
    pub tracked_command: String,
    /// Command lines to hide, compared after trimming.
    pub hide_by_args: Vec<String>,
    pub title_excluded_ports: Vec<String>,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            tracked_command: DEFAULT_TRACKED_COMMAND.to_string(),
            hide_by_args: Vec::new(),
            title_excluded_ports: DEFAULT_TITLE_EXCLUDED_PORTS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl ClassifyOptions {
    /// Returns `true` if the process's command line is on the hide-list.
    pub fn is_hidden(&self, proc: &Process) -> bool {
        let Some(args) = proc.args.as_deref() else {
            return false;
        };
        let args = args.trim();
        self.hide_by_args.iter().any(|hidden| hidden.trim() == args)
    }
}

/// Locality of a process's traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locality {
    /// No socket has a remote peer.
    LocalOnly,
    /// Every socket has a remote peer.
    External,
    /// Some sockets have a remote peer and some do not.
    Mixed,
    /// The process holds no sockets.
    Idle,
}

/// Determines the traffic locality of a process.
pub fn locality(proc: &Process) -> Locality {
    if proc.connections.is_empty() {
        return Locality::Idle;
    }
    let listening = proc.connections.iter().filter(|c| c.is_listening()).count();
    if listening == proc.connections.len() {
        Locality::LocalOnly
    } else if listening == 0 {
        Locality::External
    } else {
        Locality::Mixed
    }
}

/// The four buckets shown by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcSections<'a> {
    pub shown_tracked: Vec<&'a Process>,
    pub hidden_tracked: Vec<&'a Process>,
    pub other_local: Vec<&'a Process>,
    pub other_external: Vec<&'a Process>,
}

/// Partitions processes into the four presentation buckets, keeping
/// snapshot order inside each.
///
/// # Examples
///
/// ```
/// use portscope_core::{ClassifyOptions, Connection, Endpoint, Process, classify};
///
/// let procs = vec![
///     Process::new(1, "node", "dev").with_args("node app.js"),
///     Process::new(2, "node", "dev").with_args("node lsp.js "),
///     Process::new(3, "redis", "dev")
///         .with_connection(Connection::new("TCP", Endpoint::new("127.0.0.1", "6379"))),
/// ];
/// let options = ClassifyOptions {
///     hide_by_args: vec!["node lsp.js".into()],
///     ..ClassifyOptions::default()
/// };
/// let sections = classify(&procs, &options);
/// assert_eq!(sections.shown_tracked[0].pid, 1);
/// assert_eq!(sections.hidden_tracked[0].pid, 2);
/// assert_eq!(sections.other_local[0].pid, 3);
/// assert!(sections.other_external.is_empty());
/// ```
pub fn classify<'a>(processes: &'a [Process], options: &ClassifyOptions) -> ProcSections<'a> {
    let mut sections = ProcSections::default();

    for proc in processes {
        if proc.cmd == options.tracked_command {
            if options.is_hidden(proc) {
                sections.hidden_tracked.push(proc);
            } else {
                sections.shown_tracked.push(proc);
            }
            continue;
        }

        match locality(proc) {
            Locality::LocalOnly => sections.other_local.push(proc),
            Locality::External => sections.other_external.push(proc),
            Locality::Mixed | Locality::Idle => {}
        }
    }

    sections
}

/// Builds the summary title from the listening ports of shown tracked
/// processes.
///
/// Excluded ports are skipped and duplicates collapse to their first
/// occurrence; ports are joined with ` · ` in first-seen order.
///
/// # Examples
///
/// ```
/// use portscope_core::{ClassifyOptions, Connection, Endpoint, Process, format_title};
///
/// let procs: Vec<Process> = ["3000", "443", "3000", "5000"]
///     .iter()
///     .enumerate()
///     .map(|(i, port)| {
///         Process::new(i as u32 + 1, "node", "dev")
///             .with_connection(Connection::new("TCP", Endpoint::new("127.0.0.1", *port)))
///     })
///     .collect();
/// assert_eq!(format_title(&procs, &ClassifyOptions::default()), "3000 · 5000");
/// ```
pub fn format_title(processes: &[Process], options: &ClassifyOptions) -> String {
    let sections = classify(processes, options);
    let mut ports: Vec<&str> = Vec::new();

    for conn in sections
        .shown_tracked
        .iter()
        .flat_map(|p| p.connections.iter())
        .filter(|c| c.is_listening())
    {
        let port = conn.local_port();
        if options.title_excluded_ports.iter().any(|p| p == port) {
            continue;
        }
        if !ports.contains(&port) {
            ports.push(port);
        }
    }

    ports.join(LABEL_SEPARATOR)
}
