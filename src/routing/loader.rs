use super::{Dialect, RouteEntry, RoutingSnapshot, RowPolicy, DIALECT_SCAN_LINES};
use crate::common::{parse_sim_time, same_time, AddressPlan, NodeId};
use crate::config::AnalysisConfig;
use crate::{AnalysisError, AnalysisErrorKind};
use regex::Regex;
use slog::Logger;
use std::collections::HashMap;
use std::path::Path;

lazy_static! {
    static ref NODE_HEADER: Regex =
        Regex::new(r"^Node:?\s*(?P<node>\d+)\D*?Time:\s*(?P<time>[^\s,;]+)")
            .expect("Node header pattern is valid");
}

/// Prefix of the column-header line that precedes the rows of a table.
const TABLE_HEADER: &str = "Destination";

/// Parses the node id and timestamp out of a table header line.
fn parse_node_header(line: &str) -> Option<(NodeId, f64)> {
    let caps = NODE_HEADER.captures(line)?;
    let node = caps.name("node")?.as_str().parse::<NodeId>().ok()?;
    let time = parse_sim_time(caps.name("time")?.as_str())?;
    Some((node, time))
}

fn check_block_time(
    node: NodeId,
    node_time: f64,
    time: f64,
    line_idx: usize,
) -> Result<(), AnalysisError> {
    if same_time(node_time, time) {
        return Ok(());
    }
    let err_msg = format!(
        "Table of node {} at line {} is for time {}s while reading time {}s",
        node,
        line_idx + 1,
        node_time,
        time
    );
    Err(AnalysisErrorKind::Desynchronized(err_msg).into())
}

/// Builds routing snapshots out of the simulator's routing-table dumps.
#[derive(Debug, Clone)]
pub struct TableLoader {
    plan: AddressPlan,
    policies: HashMap<Dialect, RowPolicy>,
    scan_lines: usize,
    logger: Logger,
}

impl TableLoader {
    /// Creates a loader with the default address plan and dialect policies.
    pub fn new(logger: Logger) -> TableLoader {
        TableLoader {
            plan: AddressPlan::default(),
            policies: HashMap::new(),
            scan_lines: DIALECT_SCAN_LINES,
            logger,
        }
    }

    /// Creates a loader configured from the analysis configuration.
    pub fn from_config(config: &AnalysisConfig, logger: Logger) -> Result<TableLoader, AnalysisError> {
        let mut loader = TableLoader::new(logger);
        loader.plan = config.address_plan()?;
        loader.scan_lines = config.dialect_scan_lines;
        for (dialect, policy) in config.policy_overrides() {
            loader = loader.with_policy(dialect, policy);
        }
        Ok(loader)
    }

    /// Overrides the row policy of a dialect.
    pub fn with_policy(mut self, dialect: Dialect, policy: RowPolicy) -> TableLoader {
        if policy != dialect.default_policy() {
            debug!(
                self.logger,
                "Row policy overridden";
                "dialect" => dialect,
                "status_column" => ?policy.status_column,
                "accepted" => ?policy.accepted_statuses,
                "excluded" => ?policy.excluded_statuses,
            );
        }
        self.policies.insert(dialect, policy);
        self
    }

    /// Row policy in effect for a dialect.
    pub fn policy(&self, dialect: Dialect) -> RowPolicy {
        self.policies
            .get(&dialect)
            .cloned()
            .unwrap_or_else(|| dialect.default_policy())
    }

    /// Detects the dialect of a dump.
    pub fn detect(&self, text: &str) -> Result<Dialect, AnalysisError> {
        Dialect::detect(text, self.scan_lines)
    }

    /// Lists the distinct timestamps that have table blocks in a dump, in file order.
    pub fn timestamps(&self, text: &str) -> Vec<f64> {
        let mut times: Vec<f64> = Vec::new();
        for (_node, time) in text.lines().filter_map(|l| parse_node_header(l.trim())) {
            if !times.iter().any(|t| same_time(*t, time)) {
                times.push(time);
            }
        }
        times
    }

    /// Reads and parses a dump file. See `load`.
    pub fn load_file<P: AsRef<Path>>(
        &self,
        path: P,
        time: f64,
        node_count: usize,
    ) -> Result<RoutingSnapshot, AnalysisError> {
        let text = crate::read_file(path)?;
        self.load(&text, time, node_count)
    }

    /// Parses the tables of `node_count` nodes dumped at `time`.
    /// Fails if the dialect can't be detected, if no table was dumped at `time`, or if one of the
    /// `node_count` consecutive blocks carries a different timestamp. Rows whose addresses are
    /// not node addresses are skipped.
    pub fn load(
        &self,
        text: &str,
        time: f64,
        node_count: usize,
    ) -> Result<RoutingSnapshot, AnalysisError> {
        let dialect = self.detect(text)?;
        let policy = self.policy(dialect);
        let lines: Vec<&str> = text.lines().map(str::trim).collect();

        let start = lines
            .iter()
            .position(|l| parse_node_header(l).map_or(false, |(_, t)| same_time(t, time)))
            .ok_or_else(|| {
                let err_msg = format!("No {} routing table found for time {}s", dialect, time);
                AnalysisError::from(AnalysisErrorKind::SnapshotNotFound(err_msg))
            })?;

        let mut snapshot = RoutingSnapshot::new(time, dialect);
        let mut i = start;
        let mut nodes_seen = 0;
        let mut rows_skipped = 0;

        while i < lines.len() && nodes_seen < node_count {
            let (node, node_time) = parse_node_header(lines[i]).ok_or_else(|| {
                let err_msg = format!(
                    "Expected a node header at line {}, found \"{}\"",
                    i + 1,
                    lines[i]
                );
                AnalysisError::from(AnalysisErrorKind::Desynchronized(err_msg))
            })?;
            check_block_time(node, node_time, time, i)?;
            snapshot.add_node(node);
            nodes_seen += 1;
            i += 1;

            //Banner lines up to the column header. List routing prints one more header for
            //the same node per protocol it holds.
            while i < lines.len() && !lines[i].starts_with(TABLE_HEADER) {
                match parse_node_header(lines[i]) {
                    Some((other, _)) if other != node => break,
                    Some((_, banner_time)) => check_block_time(node, banner_time, time, i)?,
                    None => {}
                }
                i += 1;
            }

            if i < lines.len() && lines[i].starts_with(TABLE_HEADER) {
                i += 1;
                while i < lines.len() && !lines[i].is_empty() && parse_node_header(lines[i]).is_none() {
                    let fields: Vec<&str> = lines[i].split_whitespace().collect();
                    match self.parse_row(&fields, &policy, node_count) {
                        Some((destination, entry)) => snapshot.insert_route(node, destination, entry),
                        None => rows_skipped += 1,
                    }
                    i += 1;
                }
            }

            while i < lines.len() && lines[i].is_empty() {
                i += 1;
            }
        }

        if nodes_seen < node_count {
            warn!(
                self.logger,
                "Routing table dump ended early";
                "time" => time,
                "expected" => node_count,
                "found" => nodes_seen,
            );
        }
        debug!(
            self.logger,
            "Routing snapshot loaded";
            "time" => time,
            "dialect" => dialect,
            "nodes" => nodes_seen,
            "rows_skipped" => rows_skipped,
        );

        Ok(snapshot)
    }

    fn parse_row(
        &self,
        fields: &[&str],
        policy: &RowPolicy,
        node_count: usize,
    ) -> Option<(NodeId, RouteEntry)> {
        if fields.len() < 2 || !policy.accepts(fields) {
            return None;
        }
        let destination = self.plan.node_id(fields[0], Some(node_count))?;
        let next_hop = self.plan.node_id(fields[1], Some(node_count))?;
        let hop_count = policy.hop_count(fields)?;

        Some((destination, RouteEntry { next_hop, hop_count }))
    }
}
