//! Flow statistics from the simulator's flow monitor, and the metrics computed over them.
//! The flow monitor writes an XML document with one `<Flow>` element per flow under
//! `<FlowStats>` (counters) and another under `<Ipv4FlowClassifier>` (the 5-tuple). Both are
//! merged by flow id.

use crate::common::parse_sim_time;
use crate::{AnalysisError, AnalysisErrorKind};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::path::Path;

lazy_static! {
    static ref FLOW_ELEMENT: Regex =
        Regex::new(r"<Flow\s+(?P<attrs>[^>]*?)/?>").expect("Flow element pattern is valid");
    static ref ATTRIBUTE: Regex =
        Regex::new(r#"(?P<key>\w+)="(?P<value>[^"]*)""#).expect("Attribute pattern is valid");
}

/// Statistics of one flow
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct FlowStats {
    /// Flow id assigned by the flow monitor
    pub flow_id: u32,
    /// Packets sent by the source
    pub tx_packets: u64,
    /// Packets received by the destination
    pub rx_packets: u64,
    /// Bytes sent by the source
    pub tx_bytes: u64,
    /// Bytes received by the destination
    pub rx_bytes: u64,
    /// Packets declared lost
    pub lost_packets: u64,
    /// Number of times packets of the flow were forwarded
    pub times_forwarded: u64,
    /// Sum of the end-to-end delay of all received packets, in seconds
    pub delay_sum: f64,
    /// Time the first packet was sent, in seconds
    pub time_first_tx: Option<f64>,
    /// Time the last packet was received, in seconds
    pub time_last_rx: Option<f64>,
    /// Source address
    pub source_address: String,
    /// Source port
    pub source_port: u16,
    /// Destination address
    pub destination_address: String,
    /// Destination port
    pub destination_port: u16,
    /// IP protocol number
    pub protocol: u8,
}

impl FlowStats {
    /// Goodput of the flow over its lifetime, in kbps.
    pub fn goodput_kbps(&self) -> Option<f64> {
        let duration = self.time_last_rx? - self.time_first_tx?;
        if duration <= 0.0 {
            return None;
        }
        Some(self.rx_bytes as f64 * 8.0 / 1000.0 / duration)
    }
}

/// Flow statistics by flow id.
pub type FlowTable = BTreeMap<u32, FlowStats>;

fn attributes(attrs: &str) -> HashMap<&str, &str> {
    ATTRIBUTE
        .captures_iter(attrs)
        .filter_map(|c| Some((c.name("key")?.as_str(), c.name("value")?.as_str())))
        .collect()
}

fn section<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close).map_or(xml.len(), |e| start + e);
    Some(&xml[start..end])
}

fn parse_error(flow_id: u32, attr: &str) -> AnalysisError {
    let err_msg = format!("Missing or invalid attribute {} of flow {}", attr, flow_id);
    AnalysisErrorKind::Parsing(err_msg).into()
}

fn number<T: std::str::FromStr>(
    attrs: &HashMap<&str, &str>,
    flow_id: u32,
    key: &str,
) -> Result<T, AnalysisError> {
    attrs
        .get(key)
        .and_then(|v| v.parse::<T>().ok())
        .ok_or_else(|| parse_error(flow_id, key))
}

/// Parses the flow monitor XML output.
pub fn parse_flow_monitor(xml: &str) -> Result<FlowTable, AnalysisError> {
    let stats_section = section(xml, "FlowStats").ok_or_else(|| {
        let err_msg = String::from("No FlowStats element in flow monitor output");
        AnalysisError::from(AnalysisErrorKind::Parsing(err_msg))
    })?;

    let mut flows = FlowTable::new();
    for element in FLOW_ELEMENT.captures_iter(stats_section) {
        let attrs = attributes(&element["attrs"]);
        let flow_id: u32 = attrs
            .get("flowId")
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| {
                let err_msg = String::from("Flow element without a flowId");
                AnalysisError::from(AnalysisErrorKind::Parsing(err_msg))
            })?;
        let delay_sum = attrs
            .get("delaySum")
            .and_then(|v| parse_sim_time(v))
            .ok_or_else(|| parse_error(flow_id, "delaySum"))?;

        let stats = FlowStats {
            flow_id,
            tx_packets: number(&attrs, flow_id, "txPackets")?,
            rx_packets: number(&attrs, flow_id, "rxPackets")?,
            tx_bytes: number(&attrs, flow_id, "txBytes").unwrap_or(0),
            rx_bytes: number(&attrs, flow_id, "rxBytes").unwrap_or(0),
            lost_packets: number(&attrs, flow_id, "lostPackets").unwrap_or(0),
            times_forwarded: number(&attrs, flow_id, "timesForwarded")?,
            delay_sum,
            time_first_tx: attrs.get("timeFirstTxPacket").and_then(|v| parse_sim_time(v)),
            time_last_rx: attrs.get("timeLastRxPacket").and_then(|v| parse_sim_time(v)),
            ..Default::default()
        };
        flows.insert(flow_id, stats);
    }

    if let Some(classifier) = section(xml, "Ipv4FlowClassifier") {
        for element in FLOW_ELEMENT.captures_iter(classifier) {
            let attrs = attributes(&element["attrs"]);
            let flow_id: u32 = match attrs.get("flowId").and_then(|v| v.parse().ok()) {
                Some(id) => id,
                None => continue,
            };
            if let Some(stats) = flows.get_mut(&flow_id) {
                stats.source_address = attrs.get("sourceAddress").unwrap_or(&"").to_string();
                stats.destination_address =
                    attrs.get("destinationAddress").unwrap_or(&"").to_string();
                stats.source_port = number(&attrs, flow_id, "sourcePort").unwrap_or(0);
                stats.destination_port = number(&attrs, flow_id, "destinationPort").unwrap_or(0);
                stats.protocol = number(&attrs, flow_id, "protocol").unwrap_or(0);
            }
        }
    }

    Ok(flows)
}

/// Reads and parses a flow monitor file.
pub fn read_flow_monitor<P: AsRef<Path>>(path: P) -> Result<FlowTable, AnalysisError> {
    let xml = crate::read_file(path)?;
    parse_flow_monitor(&xml)
}

fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        None
    } else {
        Some(num / den)
    }
}

/// Fraction of the packets sent by data flows that never arrived.
pub fn loss_rate<F: Fn(&FlowStats) -> bool>(flows: &FlowTable, is_data: F) -> Option<f64> {
    let (lost, sent) = flows
        .values()
        .filter(|f| is_data(*f))
        .fold((0i64, 0u64), |(lost, sent), f| {
            (lost + f.tx_packets as i64 - f.rx_packets as i64, sent + f.tx_packets)
        });
    ratio(lost as f64, sent as f64)
}

/// Mean end-to-end delay of the packets received by data flows, in seconds.
pub fn average_delay<F: Fn(&FlowStats) -> bool>(flows: &FlowTable, is_data: F) -> Option<f64> {
    let (delay, received) = flows
        .values()
        .filter(|f| is_data(*f))
        .fold((0.0, 0u64), |(d, r), f| (d + f.delay_sum, r + f.rx_packets));
    ratio(delay, received as f64)
}

/// Packets received by all flows.
pub fn total_rx_packets(flows: &FlowTable) -> u64 {
    flows.values().map(|f| f.rx_packets).sum()
}

/// Packets received by flows that are not data flows.
pub fn control_packets<F: Fn(&FlowStats) -> bool>(flows: &FlowTable, is_data: F) -> u64 {
    flows
        .values()
        .filter(|f| !is_data(*f))
        .map(|f| f.rx_packets)
        .sum()
}

/// Share of all received packets that belong to control flows.
pub fn control_overhead<F: Fn(&FlowStats) -> bool>(flows: &FlowTable, is_data: F) -> Option<f64> {
    ratio(
        control_packets(flows, is_data) as f64,
        total_rx_packets(flows) as f64,
    )
}

/// Sum of the goodput of all data flows, in kbps.
pub fn goodput_kbps<F: Fn(&FlowStats) -> bool>(flows: &FlowTable, is_data: F) -> Option<f64> {
    let rates: Vec<f64> = flows
        .values()
        .filter(|f| is_data(*f))
        .filter_map(FlowStats::goodput_kbps)
        .collect();
    if rates.is_empty() {
        None
    } else {
        Some(rates.iter().sum())
    }
}

/// Predicate that selects the flows that sent more than `threshold` packets.
pub fn data_flows(threshold: u64) -> impl Fn(&FlowStats) -> bool {
    move |f| f.tx_packets > threshold
}

/// Aggregate metrics of one simulation run
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct FlowMetrics {
    /// Fraction of data packets lost
    pub loss_rate: Option<f64>,
    /// Mean end-to-end delay of data packets, in seconds
    pub average_delay: Option<f64>,
    /// Goodput of all data flows, in kbps
    pub goodput_kbps: Option<f64>,
    /// Packets received over all flows
    pub rx_packets: u64,
    /// Packets received over control flows
    pub control_packets: u64,
    /// Share of received packets that are control packets
    pub control_overhead: Option<f64>,
}

impl FlowMetrics {
    /// Computes all metrics, treating flows with more than `threshold` sent packets as data.
    pub fn compute(flows: &FlowTable, threshold: u64) -> FlowMetrics {
        FlowMetrics {
            loss_rate: loss_rate(flows, data_flows(threshold)),
            average_delay: average_delay(flows, data_flows(threshold)),
            goodput_kbps: goodput_kbps(flows, data_flows(threshold)),
            rx_packets: total_rx_packets(flows),
            control_packets: control_packets(flows, data_flows(threshold)),
            control_overhead: control_overhead(flows, data_flows(threshold)),
        }
    }

    /// Metrics as (name, value) pairs. Missing values are NaN.
    pub fn values(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("loss_rate", self.loss_rate.unwrap_or(std::f64::NAN)),
            ("average_delay", self.average_delay.unwrap_or(std::f64::NAN)),
            ("goodput_kbps", self.goodput_kbps.unwrap_or(std::f64::NAN)),
            ("rx_packets", self.rx_packets as f64),
            ("control_packets", self.control_packets as f64),
            ("control_overhead", self.control_overhead.unwrap_or(std::f64::NAN)),
        ]
    }
}

/// Renders one line per selected flow: `id src:port (tx) -> (rx) dst:port forwarded`.
pub fn format_flows<F: Fn(&FlowStats) -> bool>(flows: &FlowTable, select: F) -> String {
    let mut out = String::new();
    for f in flows.values().filter(|f| select(*f)) {
        let _ = writeln!(
            out,
            "{:<4} {:<9}:{:>05} ({:>3}) -> ({:>3}) {:<9}:{:>05}\t {:>3}",
            f.flow_id,
            f.source_address,
            f.source_port,
            f.tx_packets,
            f.rx_packets,
            f.destination_address,
            f.destination_port,
            f.times_forwarded
        );
    }
    out
}
