//! Socket-inventory parser.
//!
//! Turns the blocks produced by [`lexer::split_blocks`](crate::lexer::split_blocks)
//! into [`Process`] and [`Connection`] records. Parsing is tolerant: a block
//! that cannot be understood is skipped and reported as a
//! [`MalformedRecord`], and the rest of the listing is still parsed.
//!
//! # Examples
//!
//! ```
//! use portscope_core::parse_listing;
//!
//! let text = "p123\ncnode\nLdev\nf20\nPTCP\nn127.0.0.1:3000\nf21\nPUDP\nn*:*\n";
//! let listing = parse_listing(text);
//! assert!(listing.issues.is_empty());
//!
//! let proc = &listing.processes[0];
//! assert_eq!(proc.pid, 123);
//! assert_eq!(proc.cmd, "node");
//! // The wildcard UDP socket carries no address and is dropped.
//! assert_eq!(proc.connections.len(), 1);
//! assert_eq!(proc.connections[0].local_port(), "3000");
//! ```

use std::collections::HashMap;

use thiserror::Error;

use crate::lexer::{FieldTag, ProcessBlock, SocketBlock, split_blocks};
use crate::{Connection, Endpoint, Process};

/// Address spec the lister prints for a socket with no address at all.
pub const WILDCARD_ADDRESS_SPEC: &str = "*:*";

/// Separator between the local and remote halves of an address spec.
const REMOTE_SEPARATOR: &str = "->";

/// TCP/TPI info prefix carrying the connection state.
const STATE_PREFIX: &str = "ST=";

/// A record skipped (or merged) while parsing a listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    /// Fields appeared before the first process header.
    #[error("line {line}: {count} field(s) before the first process header")]
    StrayFields { line: usize, count: usize },
    /// The process header carries a pid that is not a positive integer.
    #[error("line {line}: invalid pid {value:?}")]
    InvalidPid { line: usize, value: String },
    /// The process header has no `c` line.
    #[error("line {line}: process {pid} has no command name")]
    MissingCommand { line: usize, pid: u32 },
    /// The process header has no `L` line.
    #[error("line {line}: process {pid} has no user name")]
    MissingUser { line: usize, pid: u32 },
    /// A socket block has an address but no `P` line.
    #[error("line {line}: socket {descriptor} of process {pid} has no protocol")]
    MissingProtocol {
        line: usize,
        pid: u32,
        descriptor: String,
    },
    /// An address spec side has no `address:port` shape.
    #[error("line {line}: cannot split address {value:?} of process {pid}")]
    InvalidAddress { line: usize, pid: u32, value: String },
    /// A pid appeared in more than one process block; its sockets were
    /// appended to the first block.
    #[error("line {line}: process {pid} listed twice, sockets merged")]
    DuplicateProcess { line: usize, pid: u32 },
}

/// Result of parsing one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedListing {
    /// Processes in listing order, without `args`/`cwd`.
    pub processes: Vec<Process>,
    pub issues: Vec<MalformedRecord>,
}

/// Parses the complete output of one `lsof -F cPnpLT` call.
pub fn parse_listing(text: &str) -> ParsedListing {
    let blocks = split_blocks(text);
    let mut listing = ParsedListing::default();

    if let Some(first) = blocks.stray.first() {
        listing.issues.push(MalformedRecord::StrayFields {
            line: first.line,
            count: blocks.stray.len(),
        });
    }

    let mut index_by_pid: HashMap<u32, usize> = HashMap::new();
    for block in &blocks.processes {
        let Some(mut proc) = parse_process_header(block, &mut listing.issues) else {
            continue;
        };
        for socket in &block.sockets {
            if let Some(connection) = parse_socket(socket, proc.pid, &mut listing.issues) {
                proc.connections.push(connection);
            }
        }

        match index_by_pid.get(&proc.pid) {
            Some(&idx) => {
                listing.issues.push(MalformedRecord::DuplicateProcess {
                    line: block.line,
                    pid: proc.pid,
                });
                listing.processes[idx].connections.append(&mut proc.connections);
            }
            None => {
                index_by_pid.insert(proc.pid, listing.processes.len());
                listing.processes.push(proc);
            }
        }
    }

    listing
}

fn parse_process_header(
    block: &ProcessBlock<'_>,
    issues: &mut Vec<MalformedRecord>,
) -> Option<Process> {
    let raw_pid = block.header_value(FieldTag::Pid).unwrap_or_default();
    let pid = match raw_pid.trim().parse::<u32>() {
        Ok(pid) if pid > 0 => pid,
        _ => {
            issues.push(MalformedRecord::InvalidPid {
                line: block.line,
                value: raw_pid.to_string(),
            });
            return None;
        }
    };

    let Some(cmd) = block.header_value(FieldTag::Command) else {
        issues.push(MalformedRecord::MissingCommand {
            line: block.line,
            pid,
        });
        return None;
    };
    let Some(user) = block.header_value(FieldTag::User) else {
        issues.push(MalformedRecord::MissingUser {
            line: block.line,
            pid,
        });
        return None;
    };

    Some(Process::new(pid, cmd, user))
}

fn parse_socket(
    socket: &SocketBlock<'_>,
    pid: u32,
    issues: &mut Vec<MalformedRecord>,
) -> Option<Connection> {
    let mut protocol = None;
    let mut name = None;
    let mut state = None;

    for field in &socket.fields {
        match field.tag {
            FieldTag::Protocol if protocol.is_none() => protocol = Some(field.value),
            FieldTag::Name if name.is_none() => name = Some(field),
            FieldTag::TcpInfo if state.is_none() => {
                state = field.value.strip_prefix(STATE_PREFIX);
            }
            _ => {}
        }
    }

    // No address at all: nothing to show for this socket.
    let name = name?;
    let (local, remote) = match split_address_spec(name.value) {
        AddressSpec::Wildcard => return None,
        AddressSpec::Invalid => {
            issues.push(MalformedRecord::InvalidAddress {
                line: name.line,
                pid,
                value: name.value.to_string(),
            });
            return None;
        }
        AddressSpec::Endpoints { local, remote } => (local, remote),
    };

    let Some(protocol) = protocol else {
        issues.push(MalformedRecord::MissingProtocol {
            line: socket.line,
            pid,
            descriptor: socket.descriptor.to_string(),
        });
        return None;
    };

    Some(Connection {
        protocol: protocol.to_string(),
        local,
        remote,
        state: state.map(String::from),
    })
}

/// Interpretation of an `n` field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSpec {
    /// `*:*`: the socket carries no address information.
    Wildcard,
    Endpoints {
        local: Endpoint,
        remote: Option<Endpoint>,
    },
    Invalid,
}

/// Splits an address spec into its local and optional remote endpoints.
///
/// # Examples
///
/// ```
/// use portscope_core::parser::{AddressSpec, split_address_spec};
/// use portscope_core::Endpoint;
///
/// assert_eq!(split_address_spec("*:*"), AddressSpec::Wildcard);
/// assert_eq!(
///     split_address_spec("*:5353"),
///     AddressSpec::Endpoints { local: Endpoint::new("*", "5353"), remote: None }
/// );
/// ```
pub fn split_address_spec(spec: &str) -> AddressSpec {
    let spec = spec.trim();
    if spec == WILDCARD_ADDRESS_SPEC {
        return AddressSpec::Wildcard;
    }

    let (local, remote) = match spec.split_once(REMOTE_SEPARATOR) {
        Some((local, remote)) => (local, Some(remote)),
        None => (spec, None),
    };

    let Some(local) = split_endpoint(local) else {
        return AddressSpec::Invalid;
    };
    let remote = match remote.map(split_endpoint) {
        Some(None) => return AddressSpec::Invalid,
        Some(Some(endpoint)) => Some(endpoint),
        None => None,
    };

    AddressSpec::Endpoints { local, remote }
}

/// Splits `host:port` on the last colon so bracketed IPv6 hosts stay whole.
fn split_endpoint(text: &str) -> Option<Endpoint> {
    let (address, port) = text.rsplit_once(':')?;
    if address.is_empty() || port.is_empty() {
        return None;
    }
    Some(Endpoint::new(address, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_socket_leaves_process_without_connections() {
        let listing = parse_listing("p123\nccustom\nLuser\nfn*:*\n");
        assert!(listing.issues.is_empty());
        assert_eq!(listing.processes.len(), 1);

        let proc = &listing.processes[0];
        assert_eq!(proc.pid, 123);
        assert_eq!(proc.cmd, "custom");
        assert_eq!(proc.user, "user");
        assert!(proc.connections.is_empty());
    }

    #[test]
    fn test_connected_socket_populates_both_endpoints() {
        let listing = parse_listing("p5\ncnode\nLdev\nf9\nPTCP\nn127.0.0.1:8080->10.0.0.5:443\n");
        let conn = &listing.processes[0].connections[0];
        assert_eq!(conn.protocol, "TCP");
        assert_eq!(conn.local_address(), "127.0.0.1");
        assert_eq!(conn.local_port(), "8080");
        assert_eq!(conn.remote_address(), Some("10.0.0.5"));
        assert_eq!(conn.remote_port(), Some("443"));
        assert_eq!(conn.to_string(), "127.0.0.1:8080 → 10.0.0.5:443");
    }

    #[test]
    fn test_address_on_f_line_keeps_connection() {
        let listing = parse_listing("p1\ncnode\nLdev\nfn127.0.0.1:3000\nPTCP\n");
        assert!(listing.issues.is_empty());
        let conns = &listing.processes[0].connections;
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].protocol, "TCP");
        assert_eq!(conns[0].local_port(), "3000");
    }

    #[test]
    fn test_marker_lines_build_one_connection_in_either_order() {
        for text in [
            "p1\ncnode\nLdev\nfn127.0.0.1:8080->10.0.0.5:443\nfPTCP\n",
            "p1\ncnode\nLdev\nfPTCP\nfn127.0.0.1:8080->10.0.0.5:443\n",
        ] {
            let listing = parse_listing(text);
            assert!(listing.issues.is_empty(), "issues: {:?}", listing.issues);
            let conns = &listing.processes[0].connections;
            assert_eq!(conns.len(), 1);
            assert_eq!(conns[0].protocol, "TCP");
            assert_eq!(conns[0].to_string(), "127.0.0.1:8080 → 10.0.0.5:443");
        }
    }

    #[test]
    fn test_listening_socket_has_no_remote_and_keeps_wildcard_port() {
        let listing = parse_listing("p5\ncnode\nLdev\nf9\nPUDP\nn127.0.0.1:*\n");
        let conn = &listing.processes[0].connections[0];
        assert_eq!(conn.local_port(), "*");
        assert!(conn.remote.is_none());
    }

    #[test]
    fn test_ipv6_endpoints_split_on_last_colon() {
        let listing = parse_listing("p5\ncnode\nLdev\nf9\nPTCP\nn[::1]:3000->[fe80::1]:52000\n");
        let conn = &listing.processes[0].connections[0];
        assert_eq!(conn.local_address(), "[::1]");
        assert_eq!(conn.local_port(), "3000");
        assert_eq!(conn.remote_address(), Some("[fe80::1]"));
        assert_eq!(conn.remote_port(), Some("52000"));
    }

    #[test]
    fn test_tcp_state_is_read_from_t_lines() {
        let listing = parse_listing("p5\ncnode\nLdev\nf9\nPTCP\nn*:3000\nTST=LISTEN\nTQR=0\n");
        let conn = &listing.processes[0].connections[0];
        assert_eq!(conn.state.as_deref(), Some("LISTEN"));
    }

    #[test]
    fn test_unknown_tags_are_ignored() {
        let listing = parse_listing("p5\ng5\ncnode\nu501\nLdev\nf9\nt IPv4\nPTCP\nn*:3000\n");
        assert!(listing.issues.is_empty());
        assert_eq!(listing.processes[0].connections.len(), 1);
    }

    #[test]
    fn test_invalid_pid_skips_only_that_process() {
        let listing = parse_listing("pabc\ncnode\nLdev\nf1\nPTCP\nn*:1\np7\ncnc\nLroot\n");
        assert_eq!(listing.processes.len(), 1);
        assert_eq!(listing.processes[0].pid, 7);
        assert_eq!(
            listing.issues,
            vec![MalformedRecord::InvalidPid {
                line: 1,
                value: "abc".to_string()
            }]
        );
    }

    #[test]
    fn test_zero_pid_is_invalid() {
        let listing = parse_listing("p0\ncnode\nLdev\n");
        assert!(listing.processes.is_empty());
        assert_eq!(listing.issues.len(), 1);
    }

    #[test]
    fn test_truncated_header_is_skipped() {
        let listing = parse_listing("p1\ncnode\np2\ncnc\nLroot\n");
        assert_eq!(listing.processes.len(), 1);
        assert_eq!(
            listing.issues,
            vec![MalformedRecord::MissingUser { line: 1, pid: 1 }]
        );
    }

    #[test]
    fn test_socket_without_protocol_is_skipped() {
        let listing = parse_listing("p1\ncnode\nLdev\nf3\nn*:80\nf4\nPTCP\nn*:81\n");
        let proc = &listing.processes[0];
        assert_eq!(proc.connections.len(), 1);
        assert_eq!(proc.connections[0].local_port(), "81");
        assert!(matches!(
            listing.issues[0],
            MalformedRecord::MissingProtocol { pid: 1, .. }
        ));
    }

    #[test]
    fn test_address_without_port_is_reported() {
        let listing = parse_listing("p1\ncnode\nLdev\nf3\nPTCP\nnlocalhost\n");
        assert!(listing.processes[0].connections.is_empty());
        assert!(matches!(
            listing.issues[0],
            MalformedRecord::InvalidAddress { line: 6, pid: 1, .. }
        ));
    }

    #[test]
    fn test_socket_without_name_is_dropped_silently() {
        let listing = parse_listing("p1\ncnode\nLdev\nf3\nPTCP\n");
        assert!(listing.processes[0].connections.is_empty());
        assert!(listing.issues.is_empty());
    }

    #[test]
    fn test_duplicate_pid_merges_connections() {
        let listing = parse_listing(
            "p1\ncnode\nLdev\nf3\nPTCP\nn*:3000\np1\ncnode\nLdev\nf4\nPTCP\nn*:3001\n",
        );
        assert_eq!(listing.processes.len(), 1);
        assert_eq!(listing.processes[0].local_ports(), vec!["3000", "3001"]);
        assert_eq!(
            listing.issues,
            vec![MalformedRecord::DuplicateProcess { line: 7, pid: 1 }]
        );
    }

    #[test]
    fn test_stray_fields_are_reported_once() {
        let listing = parse_listing("f3\nPTCP\nn*:1\np2\ncnc\nLroot\n");
        assert_eq!(listing.processes.len(), 1);
        assert_eq!(
            listing.issues,
            vec![MalformedRecord::StrayFields { line: 1, count: 3 }]
        );
    }

    #[test]
    fn test_empty_listing() {
        let listing = parse_listing("");
        assert!(listing.processes.is_empty());
        assert!(listing.issues.is_empty());
    }
}
