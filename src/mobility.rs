//! Reader for the network-state log the simulation writes once per simulated second: node
//! positions, the number of sink nodes and the aggregate throughput.

use crate::common::NodeId;
use crate::{AnalysisError, AnalysisErrorKind};
use slog::{Key, Record, Serializer, Value};
use std::collections::BTreeMap;
use std::num::ParseFloatError;
use std::path::Path;
use std::str::FromStr;

///Struct to encapsule the 3D position of a node
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default, Copy)]
pub struct Position {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl FromStr for Position {
    type Err = ParseFloatError;

    /// Parses `x y z`, `(x,y,z)` or `(x,y)`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let coords: Vec<&str> = s
            .trim_matches(|p| p == '(' || p == ')' || p == '"')
            .split(|p: char| p == ',' || p.is_whitespace())
            .filter(|c| !c.is_empty())
            .collect();

        let x = coords.get(0).copied().unwrap_or("").parse::<f64>()?;
        let y = coords.get(1).copied().unwrap_or("").parse::<f64>()?;
        let z = match coords.get(2) {
            Some(c) => c.parse::<f64>()?,
            None => 0.0,
        };

        Ok(Position { x, y, z })
    }
}

impl Value for Position {
    fn serialize(&self, _rec: &Record, key: Key, serializer: &mut dyn Serializer) -> slog::Result {
        let val = format!("({},{},{})", self.x, self.y, self.z);
        serializer.emit_str(key, &val)
    }
}

/// State of the network at one point of the simulation
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct NetworkState {
    /// Simulation time in seconds
    pub time: f64,
    /// Number of sink nodes. Nodes `0..num_sinks` are sinks.
    pub num_sinks: usize,
    /// Aggregate receive rate over the last second, in kbps
    pub throughput: Option<f64>,
    /// Position of every node, indexed by node id
    pub positions: Vec<Position>,
}

impl NetworkState {
    /// Number of nodes in the simulation
    pub fn num_nodes(&self) -> usize {
        self.positions.len()
    }

    /// Sink nodes, in flow order.
    pub fn sinks(&self) -> Vec<NodeId> {
        (0..self.num_sinks).collect()
    }

    /// Source nodes, in flow order. Source `j` sends to sink `j`.
    pub fn sources(&self) -> Vec<NodeId> {
        (self.num_sinks..2 * self.num_sinks)
            .filter(|n| *n < self.num_nodes())
            .collect()
    }

    /// (source, sink) pairs of the traffic flows.
    pub fn flow_pairs(&self) -> Vec<(NodeId, NodeId)> {
        self.sources().into_iter().zip(self.sinks()).collect()
    }
}

/// Records of a state log, by integer simulation second.
pub type StateLog = BTreeMap<u64, NetworkState>;

struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos: usize,
}

impl<'a> LineCursor<'a> {
    fn new(text: &'a str) -> Self {
        LineCursor {
            lines: text.lines().map(str::trim).collect(),
            pos: 0,
        }
    }

    fn skip_blank(&mut self) {
        while self.pos < self.lines.len() && self.lines[self.pos].is_empty() {
            self.pos += 1;
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.pos).copied()
    }

    fn next_line(&mut self) -> Result<&'a str, AnalysisError> {
        let line = self.peek().ok_or_else(|| {
            let err_msg = format!("Unexpected end of state log at line {}", self.pos + 1);
            AnalysisError::from(AnalysisErrorKind::Parsing(err_msg))
        })?;
        self.pos += 1;
        Ok(line)
    }

    fn error(&self, msg: &str) -> AnalysisError {
        let err_msg = format!("{} at line {} of state log", msg, self.pos);
        AnalysisErrorKind::Parsing(err_msg).into()
    }

    /// Reads a `TAG value` line.
    fn tagged<T: FromStr>(&mut self, tag: &str) -> Result<T, AnalysisError> {
        let line = self.next_line()?;
        let mut parts = line.split_whitespace();
        if parts.next() != Some(tag) {
            return Err(self.error(&format!("Expected {}, found \"{}\"", tag, line)));
        }
        parts
            .next()
            .and_then(|v| v.parse::<T>().ok())
            .ok_or_else(|| self.error(&format!("Invalid {} value", tag)))
    }
}

/// Parses a state log.
pub fn parse_state_log(text: &str) -> Result<StateLog, AnalysisError> {
    let mut states = StateLog::new();
    let mut cursor = LineCursor::new(text);

    cursor.skip_blank();
    while !cursor.at_end() {
        let time: f64 = cursor.tagged("TIME")?;
        let num_nodes: usize = cursor.tagged("NUM_NODES")?;
        let num_sinks: usize = cursor.tagged("NUM_SINKS")?;
        let throughput = match cursor.peek() {
            Some(l) if l.starts_with("THROUGHPUT") => Some(cursor.tagged::<f64>("THROUGHPUT")?),
            _ => None,
        };
        if cursor.next_line()? != "POSITIONS" {
            return Err(cursor.error("Expected POSITIONS"));
        }

        let mut positions = vec![Position::default(); num_nodes];
        for _ in 0..num_nodes {
            let line = cursor.next_line()?;
            let (id, pos) = match line.find(char::is_whitespace) {
                Some(split) => (&line[..split], &line[split..]),
                None => return Err(cursor.error("Expected a node position")),
            };
            let id = id
                .parse::<NodeId>()
                .ok()
                .filter(|id| *id < num_nodes)
                .ok_or_else(|| cursor.error(&format!("Invalid node id {}", id)))?;
            positions[id] = pos
                .parse::<Position>()
                .map_err(|_| cursor.error("Invalid node position"))?;
        }

        let state = NetworkState {
            time,
            num_sinks,
            throughput,
            positions,
        };
        states.insert(time as u64, state);
        cursor.skip_blank();
    }

    Ok(states)
}

/// Reads and parses a state log file.
pub fn read_state_log<P: AsRef<Path>>(path: P) -> Result<StateLog, AnalysisError> {
    let text = crate::read_file(path)?;
    parse_state_log(&text)
}
