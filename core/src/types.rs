//! Socket inventory data model.
//!
//! This module defines the records produced by the listing parser and
//! consumed by the classifier. The types are designed for serialization with
//! [`serde`] so a [`Snapshot`] can be cached as JSON or rendered as YAML.

use serde::{Deserialize, Serialize};

/// One side of a socket: an address and a port.
///
/// The port is kept as text because the listing reports unspecified ports as
/// the wildcard `*`.
///
/// # Examples
///
/// ```
/// use portscope_core::Endpoint;
///
/// let ep = Endpoint::new("127.0.0.1", "3000");
/// assert_eq!(ep.to_string(), "127.0.0.1:3000");
///
/// let any = Endpoint::new("*", "5353");
/// assert!(any.is_wildcard_address());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: String,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            port: port.into(),
        }
    }

    /// Returns `true` when the address is the unspecified wildcard `*`.
    pub fn is_wildcard_address(&self) -> bool {
        self.address == "*"
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// One socket owned by a process.
///
/// A connection always has a local endpoint. The remote endpoint is only
/// present for connected sockets; a connection without one is listening
/// (TCP) or unconnected (UDP).
///
/// # Examples
///
/// ```
/// use portscope_core::{Connection, Endpoint};
///
/// let conn = Connection::new("TCP", Endpoint::new("127.0.0.1", "8080"))
///     .with_remote(Endpoint::new("10.0.0.5", "443"));
/// assert_eq!(conn.local_port(), "8080");
/// assert_eq!(conn.remote_address(), Some("10.0.0.5"));
/// assert!(!conn.is_listening());
/// assert_eq!(conn.to_string(), "127.0.0.1:8080 → 10.0.0.5:443");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Transport protocol tag as reported by the lister (`TCP`, `UDP`).
    pub protocol: String,
    pub local: Endpoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<Endpoint>,
    /// TCP state (`LISTEN`, `ESTABLISHED`, ...) when the lister reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Connection {
    pub fn new(protocol: impl Into<String>, local: Endpoint) -> Self {
        Self {
            protocol: protocol.into(),
            local,
            remote: None,
            state: None,
        }
    }

    pub fn with_remote(mut self, remote: Endpoint) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn with_state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    pub fn local_address(&self) -> &str {
        &self.local.address
    }

    pub fn local_port(&self) -> &str {
        &self.local.port
    }

    pub fn remote_address(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.address.as_str())
    }

    pub fn remote_port(&self) -> Option<&str> {
        self.remote.as_ref().map(|r| r.port.as_str())
    }

    /// Returns `true` when the socket has no remote peer.
    pub fn is_listening(&self) -> bool {
        self.remote.is_none()
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::format::format_endpoints(
            Some(&self.local),
            self.remote.as_ref(),
        ))
    }
}

/// One OS process holding at least one matching socket.
///
/// Built by the parser from one process block. `args` and `cwd` are filled
/// in later by enrichment and stay `None` when the lookup could not resolve
/// the pid.
///
/// # Examples
///
/// ```
/// use portscope_core::Process;
///
/// let proc = Process::new(4242, "node", "dev");
/// assert!(proc.args.is_none());
/// assert!(proc.connections.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Process {
    pub pid: u32,
    /// Short command name as reported by the lister.
    pub cmd: String,
    pub user: String,
    /// Full invocation command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<String>,
    /// Working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Sockets in the order they appeared in the listing.
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Process {
    pub fn new(pid: u32, cmd: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            pid,
            cmd: cmd.into(),
            user: user.into(),
            args: None,
            cwd: None,
            connections: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: &str) -> Self {
        self.args = Some(args.to_string());
        self
    }

    pub fn with_connection(mut self, connection: Connection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Distinct local ports in first-seen order.
    pub fn local_ports(&self) -> Vec<&str> {
        let mut ports: Vec<&str> = Vec::new();
        for conn in &self.connections {
            if !ports.contains(&conn.local_port()) {
                ports.push(conn.local_port());
            }
        }
        ports
    }
}

/// The ordered list of processes produced by one parse + enrich cycle.
///
/// A snapshot is never mutated after it is handed to a consumer; a refresh
/// produces a new one that replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// RFC 3339 timestamp of the listing call.
    pub captured_at: String,
    pub processes: Vec<Process>,
    /// Non-fatal problems hit while building the snapshot.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Snapshot {
    pub fn new(captured_at: impl Into<String>, processes: Vec<Process>) -> Self {
        Self {
            captured_at: captured_at.into(),
            processes,
            warnings: Vec::new(),
        }
    }

    pub fn find(&self, pid: u32) -> Option<&Process> {
        self.processes.iter().find(|p| p.pid == pid)
    }

    pub fn pids(&self) -> Vec<u32> {
        self.processes.iter().map(|p| p.pid).collect()
    }

    /// Total number of connections across all processes.
    pub fn connection_count(&self) -> usize {
        self.processes.iter().map(|p| p.connections.len()).sum()
    }
}
