//! Output formatting for snapshots and sections.

use portscope_core::format::{LabelOptions, process_label};
use portscope_core::{ProcSections, Process, Snapshot};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
    Table,
}

/// Formats a full snapshot in the requested output format.
pub fn format_snapshot(
    snapshot: &Snapshot,
    format: OutputFormat,
    labels: &LabelOptions,
) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(snapshot)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(snapshot).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(snapshot_to_markdown(snapshot, labels)),
        OutputFormat::Table => Ok(snapshot_to_table(snapshot, labels)),
    }
}

/// Formats the four presentation buckets in the requested output format.
pub fn format_sections(
    sections: &ProcSections<'_>,
    format: OutputFormat,
    labels: &LabelOptions,
) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(sections)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(sections).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(sections_to_markdown(sections, labels)),
        OutputFormat::Table => Ok(sections_to_table(sections, labels)),
    }
}

fn section_entries<'s, 'a>(sections: &'s ProcSections<'a>) -> [(&'static str, &'s [&'a Process]); 4] {
    [
        ("Tracked", sections.shown_tracked.as_slice()),
        ("Hidden", sections.hidden_tracked.as_slice()),
        ("Other (local)", sections.other_local.as_slice()),
        ("Other (external)", sections.other_external.as_slice()),
    ]
}

fn snapshot_to_markdown(snapshot: &Snapshot, labels: &LabelOptions) -> String {
    let mut out = String::new();

    out.push_str("# Socket Inventory\n\n");
    out.push_str(&format!("- **Captured:** {}\n", snapshot.captured_at));
    out.push_str(&format!("- **Processes:** {}\n", snapshot.processes.len()));
    out.push_str(&format!(
        "- **Connections:** {}\n\n",
        snapshot.connection_count()
    ));

    if !snapshot.processes.is_empty() {
        out.push_str("| PID | Command | User | Label | Connections |\n");
        out.push_str("|-----|---------|------|-------|-------------|\n");
        for proc in &snapshot.processes {
            out.push_str(&process_markdown_row(proc, labels));
        }
        out.push('\n');
    }

    if !snapshot.warnings.is_empty() {
        out.push_str("## Warnings\n\n");
        for w in &snapshot.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    out
}

fn sections_to_markdown(sections: &ProcSections<'_>, labels: &LabelOptions) -> String {
    let mut out = String::new();

    for (title, procs) in section_entries(sections) {
        if procs.is_empty() {
            continue;
        }
        out.push_str(&format!("## {title}\n\n"));
        out.push_str("| PID | Command | User | Label | Connections |\n");
        out.push_str("|-----|---------|------|-------|-------------|\n");
        for proc in procs {
            out.push_str(&process_markdown_row(proc, labels));
        }
        out.push('\n');
    }

    out
}

fn process_markdown_row(proc: &Process, labels: &LabelOptions) -> String {
    let connections = proc
        .connections
        .iter()
        .map(|c| format!("`{c}`"))
        .collect::<Vec<_>>()
        .join("<br>");
    format!(
        "| {} | `{}` | {} | {} | {connections} |\n",
        proc.pid,
        proc.cmd,
        proc.user,
        process_label(proc, labels).label
    )
}

fn snapshot_to_table(snapshot: &Snapshot, labels: &LabelOptions) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Captured: {}  Processes: {}  Connections: {}\n",
        snapshot.captured_at,
        snapshot.processes.len(),
        snapshot.connection_count()
    ));
    let procs: Vec<&Process> = snapshot.processes.iter().collect();
    push_process_table(&mut out, &procs, labels);

    if !snapshot.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for w in &snapshot.warnings {
            out.push_str(&format!("  {w}\n"));
        }
    }

    out
}

fn sections_to_table(sections: &ProcSections<'_>, labels: &LabelOptions) -> String {
    let mut out = String::new();

    for (title, procs) in section_entries(sections) {
        if procs.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("{title}:\n"));
        push_process_table(&mut out, procs, labels);
    }

    out
}

fn push_process_table(out: &mut String, procs: &[&Process], labels: &LabelOptions) {
    let max_pid = procs
        .iter()
        .map(|p| p.pid.to_string().len())
        .max()
        .unwrap_or(3);
    let max_cmd = procs.iter().map(|p| p.cmd.len()).max().unwrap_or(7);

    for proc in procs {
        let label = process_label(proc, labels);
        out.push_str(&format!(
            "  {:>pid_width$}  {:<cmd_width$}  {}\n",
            proc.pid,
            proc.cmd,
            label.label,
            pid_width = max_pid,
            cmd_width = max_cmd
        ));
        for conn in &proc.connections {
            out.push_str(&format!(
                "  {:>pid_width$}  {:<cmd_width$}    {} {conn}\n",
                "",
                "",
                conn.protocol,
                pid_width = max_pid,
                cmd_width = max_cmd
            ));
        }
    }
}
