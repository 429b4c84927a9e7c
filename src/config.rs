//! Membership configuration loader (§4.7, ambient per §2a).
//!
//! Modeled on the teacher's `configurations.rs` — a dedicated module with a
//! single loader entry point — but reparsed for the plain-text
//! `memberId,host,port` format §6 prescribes rather than the teacher's TOML
//! format, since the two are not interchangeable and the spec is explicit
//! about the wire format owed to interop.

use std::fs;
use std::net::SocketAddrV4;
use std::path::Path;

use thiserror::Error;

use crate::node::NodeId;
use crate::quorum::majority;

/// One cluster member as read from the configuration file. `host`/`port`
/// are never consulted by `Node`, `Proposer`, `Acceptor`, or `Learner` —
/// they're carried purely for a downstream transport to dial out with.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
}

/// The ordered set of cluster members loaded from a configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    members: Vec<Member>,
}

impl Membership {
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// The `NodeId` set the core actually consumes.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.members.iter().map(|m| m.id).collect()
    }

    /// Majority size for this membership (§4.6), counting every member
    /// including whichever one is "self" from a given node's perspective.
    pub fn majority(&self) -> usize {
        majority(self.members.len())
    }

    pub fn socket_addr(&self, id: NodeId) -> Option<SocketAddrV4> {
        self.members
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| format!("{}:{}", m.host, m.port).parse().ok())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("could not read configuration file {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("line {line}: expected `memberId,host,port`, got {content:?}")]
    MalformedLine { line: usize, content: String },
    #[error("line {line}: invalid member id {value:?}")]
    InvalidId { line: usize, value: String },
    #[error("line {line}: invalid port {value:?}")]
    InvalidPort { line: usize, value: String },
    #[error("configuration file {path} lists no members")]
    Empty { path: String },
}

/// Parses the `memberId,host,port` file at `path`. `#`-prefixed and blank
/// lines are skipped. A malformed remaining line is a deploy-time
/// configuration error, not a runtime fault the protocol should tolerate —
/// the loader does not skip-and-continue past one, it fails the whole load.
pub fn load_membership(path: impl AsRef<Path>) -> Result<Membership, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_membership(&contents, &path.display().to_string())
}

fn parse_membership(contents: &str, path: &str) -> Result<Membership, ConfigError> {
    let mut members = Vec::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line_no = idx + 1;
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 3 {
            return Err(ConfigError::MalformedLine { line: line_no, content: line.to_string() });
        }

        let id: NodeId = fields[0]
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidId { line: line_no, value: fields[0].to_string() })?;
        let host = fields[1].trim().to_string();
        let port: u16 = fields[2]
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPort { line: line_no, value: fields[2].to_string() })?;

        members.push(Member { id, host, port });
    }

    if members.is_empty() {
        return Err(ConfigError::Empty { path: path.to_string() });
    }

    Ok(Membership { members })
}
