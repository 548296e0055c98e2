//! Replays a simulation second by second: node positions from the state log joined with the
//! routes every traffic source used to reach its sink at that moment.

use crate::common::NodeId;
use crate::mobility::{NetworkState, Position, StateLog};
use crate::routing::loader::TableLoader;
use crate::{AnalysisError, AnalysisErrorKind};
use slog::Logger;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Route used by one traffic flow.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FlowPath {
    /// Node generating the traffic
    pub source: NodeId,
    /// Node receiving the traffic
    pub sink: NodeId,
    /// Nodes the traffic traverses, from source to sink. None if there was no usable route.
    pub route: Option<Vec<NodeId>>,
}

/// The network at one simulation second.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct Frame {
    /// Simulation time in seconds
    pub time: f64,
    /// Aggregate throughput in kbps
    pub throughput: Option<f64>,
    /// Node positions, indexed by node id
    pub positions: Vec<Position>,
    /// Route of every flow
    pub flows: Vec<FlowPath>,
}

impl Frame {
    /// Number of flows that had a usable route.
    pub fn routed_flows(&self) -> usize {
        self.flows.iter().filter(|f| f.route.is_some()).count()
    }
}

fn build_frame(
    state: &NetworkState,
    table_text: &str,
    loader: &TableLoader,
) -> Result<Frame, AnalysisError> {
    let snapshot = loader.load(table_text, state.time, state.num_nodes())?;
    let flows = state
        .flow_pairs()
        .into_iter()
        .map(|(source, sink)| FlowPath {
            source,
            sink,
            route: snapshot.get_route(source, sink),
        })
        .collect();

    Ok(Frame {
        time: state.time,
        throughput: state.throughput,
        positions: state.positions.clone(),
        flows,
    })
}

/// Builds one frame per state record. Records whose time has no routing table dump are
/// skipped.
pub fn build_frames(
    states: &StateLog,
    table_text: &str,
    loader: &TableLoader,
    logger: &Logger,
) -> Result<Vec<Frame>, AnalysisError> {
    let mut frames = Vec::with_capacity(states.len());

    for state in states.values() {
        match build_frame(state, table_text, loader) {
            Ok(frame) => {
                debug!(
                    logger,
                    "Frame built";
                    "time" => frame.time,
                    "nodes" => frame.positions.len(),
                    "routed" => frame.routed_flows(),
                );
                frames.push(frame);
            }
            Err(AnalysisError {
                kind: AnalysisErrorKind::SnapshotNotFound(msg),
                ..
            }) => {
                info!(logger, "State skipped"; "time" => state.time, "reason" => msg);
            }
            Err(e) => return Err(e),
        }
    }

    info!(logger, "Replay built"; "frames" => frames.len(), "states" => states.len());
    Ok(frames)
}

/// Writes frames as JSON lines.
pub fn write_frames<W: Write>(frames: &[Frame], writer: &mut W) -> Result<(), AnalysisError> {
    for frame in frames {
        let data = serde_json::to_string(frame).map_err(|e| {
            let err_msg = format!("Failed to serialize frame at time {}", frame.time);
            AnalysisError {
                kind: AnalysisErrorKind::Serialization(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;
        writeln!(writer, "{}", data).map_err(|e| {
            let err_msg = String::from("Failed to write frame");
            AnalysisError {
                kind: AnalysisErrorKind::IO(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;
    }

    Ok(())
}

/// Writes frames as JSON lines into a file.
pub fn write_frames_to_file<P: AsRef<Path>>(
    frames: &[Frame],
    file_path: P,
) -> Result<(), AnalysisError> {
    let file = File::create(file_path.as_ref()).map_err(|e| {
        let err_msg = format!("Could not create {}", file_path.as_ref().display());
        AnalysisError {
            kind: AnalysisErrorKind::IO(err_msg),
            cause: Some(Box::new(e)),
        }
    })?;
    let mut writer = BufWriter::new(file);
    write_frames(frames, &mut writer)?;
    writer.flush().map_err(|e| {
        let err_msg = format!("Could not flush {}", file_path.as_ref().display());
        AnalysisError {
            kind: AnalysisErrorKind::IO(err_msg),
            cause: Some(Box::new(e)),
        }
    })
}
