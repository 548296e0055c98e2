//! Analysis configuration, read from a TOML file.
//! Every field has a default, so an empty file (or no file at all) yields the settings the
//! simulator's standard scenario needs.

use crate::common::{AddressPlan, DEFAULT_NODE_SUBNET};
use crate::routing::{Dialect, RowPolicy, DIALECT_SCAN_LINES};
use crate::{AnalysisError, AnalysisErrorKind};
use std::fs::File;
use std::io::Read;

/// Flows that sent more packets than this are data flows; the rest is control traffic.
pub const DEFAULT_DATA_FLOW_THRESHOLD: u64 = 300;

/// Changes to the row policy of a dialect. Fields left out keep the dialect's default.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
#[serde(default)]
pub struct PolicyOverride {
    /// Column holding the route status
    pub status_column: Option<usize>,
    /// Only rows with one of these statuses are kept, unless empty
    pub accepted_statuses: Option<Vec<String>>,
    /// Rows with one of these statuses are dropped
    pub excluded_statuses: Option<Vec<String>>,
    /// Column holding the hop count
    pub hop_column: Option<usize>,
}

impl PolicyOverride {
    /// Applies the override on top of a base policy.
    pub fn apply(&self, base: RowPolicy) -> RowPolicy {
        RowPolicy {
            status_column: self.status_column.or(base.status_column),
            accepted_statuses: self
                .accepted_statuses
                .clone()
                .unwrap_or(base.accepted_statuses),
            excluded_statuses: self
                .excluded_statuses
                .clone()
                .unwrap_or(base.excluded_statuses),
            hop_column: self.hop_column.or(base.hop_column),
        }
    }
}

/// Row policy overrides of each dialect.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
#[serde(default)]
pub struct DialectPolicies {
    /// Override for AODV tables
    pub aodv: Option<PolicyOverride>,
    /// Override for OLSR tables
    pub olsr: Option<PolicyOverride>,
    /// Override for DSDV tables
    pub dsdv: Option<PolicyOverride>,
}

///Settings shared by all the analysis commands.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Subnet node addresses are assigned from, in CIDR notation.
    pub node_subnet: String,
    /// Lines at the start of a routing dump searched for the dialect marker.
    pub dialect_scan_lines: usize,
    /// Flows with more transmitted packets than this count as data flows.
    pub data_flow_threshold: u64,
    /// Per-dialect row policy overrides.
    pub policies: DialectPolicies,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            node_subnet: String::from(DEFAULT_NODE_SUBNET),
            dialect_scan_lines: DIALECT_SCAN_LINES,
            data_flow_threshold: DEFAULT_DATA_FLOW_THRESHOLD,
            policies: DialectPolicies::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reads a TOML configuration file.
    pub fn parse_config(file_path: &str) -> Result<AnalysisConfig, AnalysisError> {
        let mut file_content = String::new();

        let mut file = File::open(file_path).map_err(|e| {
            let err_msg = format!("Failed to open configuration file {}", file_path);
            AnalysisError {
                kind: AnalysisErrorKind::Configuration(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;

        let _bytes_read = file.read_to_string(&mut file_content).map_err(|e| {
            let err_msg = String::from("Failed to read configuration file content");
            AnalysisError {
                kind: AnalysisErrorKind::Configuration(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;

        AnalysisConfig::from_toml(&file_content)
    }

    /// Parses a TOML configuration.
    pub fn from_toml(content: &str) -> Result<AnalysisConfig, AnalysisError> {
        let config: AnalysisConfig = toml::from_str(content).map_err(|e| {
            let err_msg = String::from("Error parsing analysis configuration");
            AnalysisError {
                kind: AnalysisErrorKind::Configuration(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;
        if config.dialect_scan_lines == 0 {
            let err_msg = String::from("dialect_scan_lines must be at least 1");
            return Err(AnalysisErrorKind::Configuration(err_msg).into());
        }
        Ok(config)
    }

    /// Address plan built from the configured subnet.
    pub fn address_plan(&self) -> Result<AddressPlan, AnalysisError> {
        AddressPlan::new(&self.node_subnet)
    }

    /// The row policies of the dialects that have an override, each override applied on top
    /// of the dialect's default policy.
    pub fn policy_overrides(&self) -> Vec<(Dialect, RowPolicy)> {
        let configured = [
            (Dialect::AODV, &self.policies.aodv),
            (Dialect::OLSR, &self.policies.olsr),
            (Dialect::DSDV, &self.policies.dsdv),
        ];
        configured
            .iter()
            .filter_map(|(dialect, over)| {
                over.as_ref()
                    .map(|o| (*dialect, o.apply(dialect.default_policy())))
            })
            .collect()
    }
}
