//! Node identity and value formats shared by all the simulator output readers.

use crate::{AnalysisError, AnalysisErrorKind};
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Index of a node in the simulation, as assigned by the simulator.
pub type NodeId = usize;

/// Subnet the simulator assigns node addresses from.
pub const DEFAULT_NODE_SUBNET: &str = "10.1.1.0/24";

/// Maps simulator IP addresses to node ids.
/// The first host address of the subnet is node 0, the second node 1, and so on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddressPlan {
    subnet: Ipv4Network,
}

impl AddressPlan {
    /// Creates an address plan over the given subnet, in CIDR notation.
    pub fn new(subnet: &str) -> Result<AddressPlan, AnalysisError> {
        let subnet = Ipv4Network::from_str(subnet).map_err(|e| {
            let err_msg = format!("Invalid node subnet {}", subnet);
            AnalysisError {
                kind: AnalysisErrorKind::Configuration(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;
        Ok(AddressPlan { subnet })
    }

    /// The subnet node addresses are taken from.
    pub fn subnet(&self) -> Ipv4Network {
        self.subnet
    }

    /// Decodes an address into a node id. Returns None for anything that is not a node address:
    /// unparsable text, addresses outside the subnet, the network and broadcast addresses, and
    /// ids at or beyond `node_count` when one is given.
    pub fn node_id(&self, addr: &str, node_count: Option<usize>) -> Option<NodeId> {
        let ip = Ipv4Addr::from_str(addr.trim()).ok()?;
        if !self.subnet.contains(ip) || ip == self.subnet.broadcast() {
            return None;
        }
        let offset = u32::from(ip) - u32::from(self.subnet.network());
        if offset == 0 {
            return None;
        }
        let id = (offset - 1) as NodeId;
        match node_count {
            Some(count) if id >= count => None,
            _ => Some(id),
        }
    }
}

impl Default for AddressPlan {
    fn default() -> Self {
        AddressPlan {
            subnet: Ipv4Network::new(Ipv4Addr::new(10, 1, 1, 0), 24)
                .expect("Default node subnet is a valid network"),
        }
    }
}

/// Parses a simulator time value into seconds. Accepts the unit-suffixed form the simulator
/// prints (`+1s`, `+250ms`, `+1.2e+09ns`) as well as bare numbers, which are taken as seconds.
pub fn parse_sim_time(value: &str) -> Option<f64> {
    let value = value.trim().trim_start_matches('+');
    // (suffix, multiplier, divisor)
    let units: [(&str, f64, f64); 7] = [
        ("ns", 1.0, 1e9),
        ("us", 1.0, 1e6),
        ("ms", 1.0, 1e3),
        ("min", 60.0, 1.0),
        ("s", 1.0, 1.0),
        ("h", 3600.0, 1.0),
        ("d", 86400.0, 1.0),
    ];
    for (suffix, mul, div) in units.iter() {
        if value.ends_with(suffix) {
            let number = &value[..value.len() - suffix.len()];
            return number.parse::<f64>().ok().map(|n| n * mul / div);
        }
    }
    value.parse::<f64>().ok()
}

/// Tolerance used when matching simulation timestamps.
pub const TIME_EPSILON: f64 = 1e-9;

/// Compares two simulation timestamps in seconds.
pub fn same_time(a: f64, b: f64) -> bool {
    (a - b).abs() < TIME_EPSILON
}
