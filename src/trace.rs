//! Routing overhead computed from the simulator's ASCII packet trace.
//! Overhead is the number of routing-protocol bytes transmitted once traffic has started,
//! relative to the payload bytes transmitted by the traffic sources themselves.

use crate::common::{AddressPlan, NodeId};
use crate::routing::Dialect;
use crate::{AnalysisError, AnalysisErrorKind};
use regex::Regex;
use std::path::Path;

lazy_static! {
    static ref NODE_PATH: Regex =
        Regex::new(r"/NodeList/(?P<node>\d+)/").expect("Node path pattern is valid");
    static ref LENGTH: Regex =
        Regex::new(r"length: (?P<size>\d+)").expect("Length pattern is valid");
    static ref PAYLOAD_HEADER: Regex =
        Regex::new(r"length: (?P<size>\d+) (?P<src>\S+) > (?P<dst>\S+)\)")
            .expect("Payload header pattern is valid");
}

const TX_EVENT: &str = "State/Tx";
const PAYLOAD_MARKER: &str = "Payload";

/// One transmission event of the trace.
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    /// Simulation time in seconds
    pub time: f64,
    /// Transmitting node
    pub node: NodeId,
    /// IP packet size in bytes
    pub size: u64,
    /// Node the packet originated at, for payload packets
    pub source: Option<NodeId>,
}

/// Transmissions of a trace, split by kind.
#[derive(Debug, Clone, Default)]
pub struct TraceSummary {
    /// Routing protocol packets
    pub routing: Vec<Transmission>,
    /// Application payload packets, including forwarded ones
    pub payload: Vec<Transmission>,
}

impl TraceSummary {
    /// Payload packets sent by the node that generated them.
    pub fn originated(&self) -> impl Iterator<Item = &Transmission> {
        self.payload
            .iter()
            .filter(|t| t.source.map_or(false, |s| s == t.node))
    }

    /// Routing bytes over originated payload bytes, counting routing traffic sent after the
    /// first originated payload packet.
    pub fn routing_overhead(&self) -> Result<f64, AnalysisError> {
        let start = self
            .originated()
            .map(|t| t.time)
            .fold(None, |min: Option<f64>, t| Some(min.map_or(t, |m| m.min(t))))
            .ok_or_else(|| {
                let err_msg = String::from("The trace has no originated payload transmissions");
                AnalysisError::from(AnalysisErrorKind::Parsing(err_msg))
            })?;

        let routing_bytes: u64 = self
            .routing
            .iter()
            .filter(|t| t.time > start)
            .map(|t| t.size)
            .sum();
        let payload_bytes: u64 = self.originated().map(|t| t.size).sum();
        if payload_bytes == 0 {
            let err_msg = String::from("Originated payload transmissions carry no bytes");
            return Err(AnalysisErrorKind::Parsing(err_msg).into());
        }

        Ok(routing_bytes as f64 / payload_bytes as f64)
    }
}

/// Detects the routing protocol from the first line of a trace. If several protocol names
/// appear, the last one in `aodv`, `olsr`, `dsdv` order wins.
pub fn detect_protocol(text: &str) -> Result<Dialect, AnalysisError> {
    let first = text.lines().next().unwrap_or("");
    Dialect::ALL
        .iter()
        .rev()
        .copied()
        .find(|d| first.contains(d.trace_name()))
        .ok_or_else(|| {
            let err_msg = format!("Unknown routing protocol in trace line \"{}\"", first);
            AnalysisErrorKind::UnknownDialect(err_msg).into()
        })
}

fn parse_error(line_num: usize, what: &str) -> AnalysisError {
    let err_msg = format!("Invalid {} in trace line {}", what, line_num + 1);
    AnalysisErrorKind::Parsing(err_msg).into()
}

fn event_time(line: &str, line_num: usize) -> Result<f64, AnalysisError> {
    line.split_whitespace()
        .nth(1)
        .and_then(|t| t.parse::<f64>().ok())
        .ok_or_else(|| parse_error(line_num, "time"))
}

fn event_node(line: &str, line_num: usize) -> Result<NodeId, AnalysisError> {
    NODE_PATH
        .captures(line)
        .and_then(|c| c["node"].parse::<NodeId>().ok())
        .ok_or_else(|| parse_error(line_num, "node path"))
}

/// Collects the routing and payload transmissions of a trace.
pub fn summarize(text: &str, plan: &AddressPlan) -> Result<(Dialect, TraceSummary), AnalysisError> {
    let dialect = detect_protocol(text)?;
    let mut summary = TraceSummary::default();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();
        if !line.starts_with('t') || !line.contains(TX_EVENT) {
            continue;
        }

        if line.contains(dialect.trace_name()) {
            let size = LENGTH
                .captures(line)
                .and_then(|c| c["size"].parse::<u64>().ok())
                .ok_or_else(|| parse_error(line_num, "packet length"))?;
            summary.routing.push(Transmission {
                time: event_time(line, line_num)?,
                node: event_node(line, line_num)?,
                size,
                source: None,
            });
        } else if line.contains(PAYLOAD_MARKER) {
            let caps = PAYLOAD_HEADER
                .captures(line)
                .ok_or_else(|| parse_error(line_num, "payload header"))?;
            let size = caps["size"]
                .parse::<u64>()
                .map_err(|_| parse_error(line_num, "packet length"))?;
            summary.payload.push(Transmission {
                time: event_time(line, line_num)?,
                node: event_node(line, line_num)?,
                size,
                source: plan.node_id(&caps["src"], None),
            });
        }
    }

    Ok((dialect, summary))
}

/// Routing overhead of a trace. See `TraceSummary::routing_overhead`.
pub fn routing_overhead(text: &str, plan: &AddressPlan) -> Result<f64, AnalysisError> {
    let (_dialect, summary) = summarize(text, plan)?;
    summary.routing_overhead()
}

/// Reads a trace file and computes its routing overhead.
pub fn read_trace<P: AsRef<Path>>(path: P, plan: &AddressPlan) -> Result<f64, AnalysisError> {
    let text = crate::read_file(path)?;
    routing_overhead(&text, plan)
}
