//! Routing-table snapshots and path reconstruction.
//! A snapshot holds the forwarding table of every node at one simulation time, as dumped by the
//! simulator for one of the supported protocols. Paths between two nodes are rebuilt by
//! following the next-hop ("gate") of each table towards the destination.

// Lint options for this module
#![deny(
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

use crate::common::NodeId;
use crate::{AnalysisError, AnalysisErrorKind};
use slog::{Key, Record, Serializer, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

//Sub-modules declaration
///Parsing of routing-table dumps into snapshots.
pub mod loader;

/// Number of lines at the head of a dump that are searched for the dialect marker.
pub const DIALECT_SCAN_LINES: usize = 16;

///Routing protocols whose table dumps can be read.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum Dialect {
    /// Ad-hoc On-Demand Distance Vector routing.
    AODV,
    /// Optimized Link State Routing.
    OLSR,
    /// Destination-Sequenced Distance Vector routing.
    DSDV,
}

impl Dialect {
    /// All supported dialects, in detection order.
    pub const ALL: [Dialect; 3] = [Dialect::AODV, Dialect::OLSR, Dialect::DSDV];

    /// Text that identifies the dialect in a routing-table dump.
    pub fn marker(self) -> &'static str {
        match self {
            Dialect::AODV => "AODV",
            Dialect::OLSR => "OLSR",
            Dialect::DSDV => "DSDV",
        }
    }

    /// Name of the protocol as it appears in packet traces.
    pub fn trace_name(self) -> &'static str {
        match self {
            Dialect::AODV => "aodv",
            Dialect::OLSR => "olsr",
            Dialect::DSDV => "dsdv",
        }
    }

    /// Value of the simulator's `protocol` argument that selects this protocol.
    pub fn simulator_code(self) -> u32 {
        match self {
            Dialect::OLSR => 1,
            Dialect::AODV => 2,
            Dialect::DSDV => 3,
        }
    }

    /// Detects the dialect of a routing-table dump by looking for a marker in its first
    /// `scan_lines` lines.
    pub fn detect(text: &str, scan_lines: usize) -> Result<Dialect, AnalysisError> {
        for line in text.lines().take(scan_lines) {
            if let Some(d) = Dialect::ALL.iter().find(|d| line.contains(d.marker())) {
                return Ok(*d);
            }
        }
        let err_msg = format!(
            "Unknown routing table dialect: none of AODV, OLSR or DSDV found in the first {} lines",
            scan_lines
        );
        Err(AnalysisErrorKind::UnknownDialect(err_msg).into())
    }

    /// The row policy used when none is configured.
    pub fn default_policy(self) -> RowPolicy {
        match self {
            Dialect::AODV => RowPolicy {
                status_column: Some(3),
                accepted_statuses: vec![String::from("UP")],
                excluded_statuses: vec![],
                hop_column: None,
            },
            Dialect::OLSR => RowPolicy {
                status_column: Some(3),
                accepted_statuses: vec![],
                excluded_statuses: vec![String::from("IN_SEARCH"), String::from("DOWN")],
                hop_column: None,
            },
            Dialect::DSDV => RowPolicy {
                status_column: Some(3),
                accepted_statuses: vec![],
                excluded_statuses: vec![String::from("IN_SEARCH"), String::from("DOWN")],
                hop_column: Some(3),
            },
        }
    }
}

impl FromStr for Dialect {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Dialect, AnalysisError> {
        match s.trim().to_uppercase().as_str() {
            "AODV" => Ok(Dialect::AODV),
            "OLSR" => Ok(Dialect::OLSR),
            "DSDV" => Ok(Dialect::DSDV),
            _ => {
                let err_msg = format!("Unsupported routing protocol {}", s);
                Err(AnalysisErrorKind::UnknownDialect(err_msg).into())
            }
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.marker())
    }
}

impl Value for Dialect {
    fn serialize(&self, _rec: &Record, key: Key, serializer: &mut dyn Serializer) -> slog::Result {
        serializer.emit_str(key, self.marker())
    }
}

/// Describes which rows of a dialect's table are usable routes and where their hop count is.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RowPolicy {
    /// Column holding the route status. None if the dialect has no status column.
    pub status_column: Option<usize>,
    /// If not empty, only rows with one of these statuses are kept.
    pub accepted_statuses: Vec<String>,
    /// Rows with one of these statuses are dropped.
    pub excluded_statuses: Vec<String>,
    /// Column holding the hop count. None means the last column.
    pub hop_column: Option<usize>,
}

impl RowPolicy {
    /// Whether a row, split in whitespace-separated fields, is a usable route.
    pub fn accepts(&self, fields: &[&str]) -> bool {
        let status = match self.status_column {
            Some(col) => fields.get(col).copied(),
            None => None,
        };
        if !self.accepted_statuses.is_empty() {
            return status.map_or(false, |s| self.accepted_statuses.iter().any(|a| a == s));
        }
        match status {
            Some(s) => !self.excluded_statuses.iter().any(|e| e == s),
            None => true,
        }
    }

    /// Hop count claimed by a row.
    pub fn hop_count(&self, fields: &[&str]) -> Option<usize> {
        let field = match self.hop_column {
            Some(col) => fields.get(col),
            None => fields.last(),
        };
        field.and_then(|f| f.parse::<usize>().ok())
    }
}

/// One forwarding-table row.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone, Copy)]
pub struct RouteEntry {
    /// Node packets for the destination are forwarded to.
    pub next_hop: NodeId,
    /// Number of hops the table claims are left to the destination.
    pub hop_count: usize,
}

/// Forwarding tables of all nodes at one simulation time.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RoutingSnapshot {
    /// Simulation time, in seconds, of the tables.
    pub time: f64,
    /// Protocol the tables belong to.
    pub dialect: Dialect,
    tables: BTreeMap<NodeId, BTreeMap<NodeId, RouteEntry>>,
}

impl RoutingSnapshot {
    /// Creates a snapshot with no tables.
    pub fn new(time: f64, dialect: Dialect) -> RoutingSnapshot {
        RoutingSnapshot {
            time,
            dialect,
            tables: BTreeMap::new(),
        }
    }

    /// Registers a node. A node with no routes still has an (empty) table.
    pub fn add_node(&mut self, node: NodeId) {
        self.tables.entry(node).or_insert_with(BTreeMap::new);
    }

    /// Adds a route to a node's table. A later route for the same destination replaces the
    /// earlier one.
    pub fn insert_route(&mut self, node: NodeId, destination: NodeId, entry: RouteEntry) {
        self.tables
            .entry(node)
            .or_insert_with(BTreeMap::new)
            .insert(destination, entry);
    }

    /// The forwarding table of a node.
    pub fn table(&self, node: NodeId) -> Option<&BTreeMap<NodeId, RouteEntry>> {
        self.tables.get(&node)
    }

    /// The route a node has towards a destination.
    pub fn entry(&self, node: NodeId, destination: NodeId) -> Option<&RouteEntry> {
        self.tables.get(&node).and_then(|t| t.get(&destination))
    }

    /// Nodes with a table in this snapshot.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.tables.keys().copied()
    }

    /// Number of nodes with a table in this snapshot.
    pub fn node_count(&self) -> usize {
        self.tables.len()
    }

    /// Rebuilds the path from `source` to `destination` by following next hops.
    /// The hop count the source claims is used as a budget: each step spends one hop, and the
    /// walk gives up when the budget runs out or a node on the way has no route. Returns None
    /// when there is no usable route.
    pub fn get_route(&self, source: NodeId, destination: NodeId) -> Option<Vec<NodeId>> {
        let mut budget = self.entry(source, destination)?.hop_count;
        let mut route = vec![source];
        let mut current = source;

        while current != destination {
            if budget == 0 {
                return None;
            }
            let gate = self.entry(current, destination)?.next_hop;
            route.push(gate);
            current = gate;
            budget -= 1;
        }

        Some(route)
    }
}
