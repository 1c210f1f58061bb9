//! Argument and working-directory enrichment.
//!
//! The socket listing only carries a short command name. Full invocation
//! strings come from one batched `ps -o pid= -o command= -p <pids>` call,
//! whose output is parsed by [`parse_args_output`] and merged with
//! [`merge_args`]. A pid missing from that output belongs to a process that
//! exited between the two calls; its `args` stay `None`.

use std::collections::HashMap;

use crate::Process;

/// Resolved command lines keyed by pid.
pub type ArgsMap = HashMap<u32, String>;

/// Parses `<pid> <command line>` lines.
///
/// Only the first space after the pid separates the two parts, so command
/// lines keep their inner whitespace. Lines with an unparsable pid or an
/// empty command are ignored.
///
/// # Examples
///
/// ```
/// use portscope_core::enrich::parse_args_output;
///
/// let out = "  412 node  server.js --port 3000\n 7 \n";
/// let args = parse_args_output(out);
/// assert_eq!(args.get(&412).map(String::as_str), Some("node  server.js --port 3000"));
/// assert!(!args.contains_key(&7));
/// ```
pub fn parse_args_output(output: &str) -> ArgsMap {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (pid, command) = line.split_once(' ')?;
            let pid = pid.parse::<u32>().ok()?;
            let command = command.trim_end();
            if command.trim().is_empty() {
                return None;
            }
            Some((pid, command.to_string()))
        })
        .collect()
}

/// Attaches resolved command lines to processes.
///
/// Each process gets exactly the value recorded for its pid, or `None` when
/// the pid is absent, so merging the same map again changes nothing.
pub fn merge_args(processes: &mut [Process], args: &ArgsMap) {
    for proc in processes {
        proc.args = args.get(&proc.pid).cloned();
    }
}

/// Extracts the working directory for `pid` from `lsof -p <pid> -d cwd -F n`
/// output.
///
/// The directory is the `n` line that follows the `fcwd` line inside the
/// block of the requested pid.
///
/// # Examples
///
/// ```
/// use portscope_core::enrich::parse_cwd_output;
///
/// let out = "p412\nfcwd\nn/home/dev/app\n";
/// assert_eq!(parse_cwd_output(out, 412).as_deref(), Some("/home/dev/app"));
/// assert_eq!(parse_cwd_output(out, 9), None);
/// ```
pub fn parse_cwd_output(output: &str, pid: u32) -> Option<String> {
    let mut in_block = false;
    let mut after_cwd = false;

    for line in output.lines() {
        if let Some(value) = line.strip_prefix('p') {
            in_block = value.trim().parse::<u32>().ok() == Some(pid);
            after_cwd = false;
            continue;
        }
        if !in_block {
            continue;
        }
        if line == "fcwd" {
            after_cwd = true;
            continue;
        }
        if after_cwd {
            if let Some(dir) = line.strip_prefix('n') {
                return Some(dir.to_string()).filter(|d| !d.is_empty());
            }
            if line.starts_with('f') {
                after_cwd = false;
            }
        }
    }

    None
}
