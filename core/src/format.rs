//! Display strings for connections and processes.

use serde::{Deserialize, Serialize};

use crate::{Endpoint, Process};

/// Arrow placed between the local and remote endpoint of a connection.
pub const CONNECTION_ARROW: &str = " → ";

/// Separator between parts of a label and between ports in a title.
pub const LABEL_SEPARATOR: &str = " · ";

/// Default character budget for process labels.
pub const DEFAULT_LABEL_MAX_CHARS: usize = 35;

const ELLIPSIS: &str = "...";

/// Renders `local → remote`, or whichever side is present, or an empty
/// string when neither is.
///
/// # Examples
///
/// ```
/// use portscope_core::Endpoint;
/// use portscope_core::format::format_endpoints;
///
/// let local = Endpoint::new("127.0.0.1", "8080");
/// let remote = Endpoint::new("10.0.0.5", "443");
/// assert_eq!(format_endpoints(Some(&local), Some(&remote)), "127.0.0.1:8080 → 10.0.0.5:443");
/// assert_eq!(format_endpoints(None, Some(&remote)), "10.0.0.5:443");
/// assert_eq!(format_endpoints(None, None), "");
/// ```
pub fn format_endpoints(local: Option<&Endpoint>, remote: Option<&Endpoint>) -> String {
    match (local, remote) {
        (Some(local), Some(remote)) => format!("{local}{CONNECTION_ARROW}{remote}"),
        (Some(side), None) | (None, Some(side)) => side.to_string(),
        (None, None) => String::new(),
    }
}

/// Shortens `label` to `max_chars` characters by cutting out its middle.
///
/// The label is trimmed first. Labels within budget are returned unchanged.
/// Longer ones lose `len - max_chars` characters centred on the midpoint and
/// get `...` in their place, so both the start and the end survive.
///
/// # Examples
///
/// ```
/// use portscope_core::format::truncate_middle;
///
/// assert_eq!(truncate_middle("  short  ", 10), "short");
/// assert_eq!(truncate_middle("abcdefghij", 6), "abc...hij");
/// ```
pub fn truncate_middle(label: &str, max_chars: usize) -> String {
    let trimmed = label.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() <= max_chars {
        return trimmed.to_string();
    }

    let removed = chars.len() - max_chars;
    let cut_start = chars.len() / 2 - removed / 2;
    let cut_end = cut_start + removed;

    let mut out: String = chars[..cut_start].iter().collect();
    out.push_str(ELLIPSIS);
    out.extend(&chars[cut_end..]);
    out
}

/// Replaces a leading home directory with `~`.
///
/// Only a whole path component matches: `/home/dev` does not shorten
/// `/home/developer`.
pub fn normalize_home(path: &str, home: Option<&str>) -> String {
    let Some(home) = home.map(|h| h.trim_end_matches('/')).filter(|h| !h.is_empty()) else {
        return path.to_string();
    };
    match path.strip_prefix(home) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => format!("~{rest}"),
        _ => path.to_string(),
    }
}

/// Kind of executable, derived from where its path lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    /// Under `/System/Applications`.
    SystemApplication,
    /// Elsewhere under `/System`.
    SystemUtility,
    /// Under `/Applications/`.
    Application,
}

impl CommandKind {
    /// Icon tag the presentation layer shows for this kind.
    pub fn icon(self) -> &'static str {
        match self {
            Self::SystemApplication | Self::SystemUtility => "gear",
            Self::Application => "app-window",
        }
    }
}

/// Longest prefix first so `/System/Applications` wins over `/System`.
const KIND_PREFIXES: &[(&str, CommandKind)] = &[
    ("/System/Applications", CommandKind::SystemApplication),
    ("/System", CommandKind::SystemUtility),
    ("/Applications/", CommandKind::Application),
];

/// Detects the kind of a command line and returns it with the remaining
/// path.
///
/// # Examples
///
/// ```
/// use portscope_core::format::{CommandKind, classify_command_path};
///
/// let (kind, rest) = classify_command_path("/Applications/Slack.app/Contents/MacOS/Slack");
/// assert_eq!(kind, Some(CommandKind::Application));
/// assert_eq!(rest, "Slack.app/Contents/MacOS/Slack");
///
/// let (kind, rest) = classify_command_path("node server.js");
/// assert_eq!(kind, None);
/// assert_eq!(rest, "node server.js");
/// ```
pub fn classify_command_path(args: &str) -> (Option<CommandKind>, &str) {
    for (prefix, kind) in KIND_PREFIXES {
        if let Some(rest) = args.strip_prefix(prefix) {
            return (Some(*kind), rest);
        }
    }
    (None, args)
}

/// Label and icon kind for one process row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessLabel {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CommandKind>,
}

/// Options for [`process_label`].
#[derive(Debug, Clone)]
pub struct LabelOptions {
    pub max_chars: usize,
    /// Home directory to abbreviate as `~`.
    pub home: Option<String>,
}

impl Default for LabelOptions {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_LABEL_MAX_CHARS,
            home: None,
        }
    }
}

/// Builds the display label of a process: its port summary and its
/// shortened command line, joined by ` · `.
///
/// The port summary is the first distinct local port, followed by
/// ` (N more)` when the process holds several. Without a command line the
/// short command name is used instead.
///
/// # Examples
///
/// ```
/// use portscope_core::{Connection, Endpoint, Process};
/// use portscope_core::format::{LabelOptions, process_label};
///
/// let proc = Process::new(1, "node", "dev")
///     .with_args("node server.js")
///     .with_connection(Connection::new("TCP", Endpoint::new("*", "3000")))
///     .with_connection(Connection::new("TCP", Endpoint::new("*", "3001")));
/// let label = process_label(&proc, &LabelOptions::default());
/// assert_eq!(label.label, "3000 (1 more) · node server.js");
/// ```
pub fn process_label(proc: &Process, options: &LabelOptions) -> ProcessLabel {
    let ports = proc.local_ports();
    let port_summary = match ports.as_slice() {
        [] => None,
        [only] => Some(only.to_string()),
        [first, rest @ ..] => Some(format!("{first} ({} more)", rest.len())),
    };

    let (kind, command) = match proc.args.as_deref() {
        Some(args) => {
            let (kind, rest) = classify_command_path(args);
            let shortened = truncate_middle(
                &normalize_home(rest, options.home.as_deref()),
                options.max_chars,
            );
            (kind, Some(shortened).filter(|s| !s.is_empty()))
        }
        None => (None, None),
    };

    let parts: Vec<String> = [port_summary, command].into_iter().flatten().collect();
    let label = if parts.is_empty() {
        proc.cmd.clone()
    } else {
        parts.join(LABEL_SEPARATOR)
    };

    ProcessLabel { label, kind }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Connection;

    #[test]
    fn test_truncate_keeps_budget_plus_marker() {
        let long = "/Users/dev/projects/website/node_modules/.bin/next dev";
        let out = truncate_middle(long, 35);
        assert_eq!(out.chars().count(), 35 + ELLIPSIS.len());
        assert!(out.starts_with("/Users/dev/project"));
        assert!(out.ends_with("bin/next dev"));
        assert!(out.contains(ELLIPSIS));
    }

    #[test]
    fn test_truncate_cut_is_centred() {
        // 12 chars, budget 8: four removed around the midpoint (index 6).
        assert_eq!(truncate_middle("abcdefghijkl", 8), "abcd...ijkl");
        // Odd removal count: 11 chars, budget 8.
        assert_eq!(truncate_middle("abcdefghijk", 8), "abcd...hijk");
    }

    #[test]
    fn test_truncate_leaves_short_strings_alone() {
        let exact = "x".repeat(35);
        assert_eq!(truncate_middle(&exact, 35), exact);
        assert_eq!(truncate_middle("", 35), "");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let out = truncate_middle("ééééééééééé", 5);
        assert_eq!(out, "éé...ééé");
    }

    #[test]
    fn test_normalize_home_only_matches_whole_component() {
        assert_eq!(
            normalize_home("/home/dev/app/server.js", Some("/home/dev")),
            "~/app/server.js"
        );
        assert_eq!(
            normalize_home("/home/developer/app", Some("/home/dev")),
            "/home/developer/app"
        );
        assert_eq!(normalize_home("/home/dev/x", Some("/home/dev/")), "~/x");
        assert_eq!(normalize_home("/home/dev/x", None), "/home/dev/x");
    }

    #[test]
    fn test_classify_prefers_longest_prefix() {
        let (kind, rest) = classify_command_path("/System/Applications/Music.app/Contents");
        assert_eq!(kind, Some(CommandKind::SystemApplication));
        assert_eq!(rest, "/Music.app/Contents");

        let (kind, _) = classify_command_path("/System/Library/CoreServices/rapportd");
        assert_eq!(kind, Some(CommandKind::SystemUtility));
        assert_eq!(kind.map(CommandKind::icon), Some("gear"));
    }

    #[test]
    fn test_process_label_falls_back_to_cmd() {
        let proc = Process::new(3, "rapportd", "dev");
        let label = process_label(&proc, &LabelOptions::default());
        assert_eq!(label.label, "rapportd");
        assert_eq!(label.kind, None);
    }

    #[test]
    fn test_process_label_applies_home_and_truncation() {
        let proc = Process::new(3, "node", "dev")
            .with_args("/home/dev/projects/a-very-long-project-name/node_modules/.bin/vite")
            .with_connection(Connection::new("TCP", Endpoint::new("127.0.0.1", "5173")));
        let options = LabelOptions {
            max_chars: 20,
            home: Some("/home/dev".to_string()),
        };
        let label = process_label(&proc, &options);
        assert!(label.label.starts_with("5173 · ~/projects"));
        assert!(label.label.ends_with(".bin/vite"));
    }
}
