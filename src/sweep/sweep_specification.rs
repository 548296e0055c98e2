//! Definition of a parameter sweep, read from a TOML file.

use crate::routing::Dialect;
use crate::{AnalysisError, AnalysisErrorKind};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use strfmt::strfmt;

/// Flow monitor file written by the simulator.
pub const DEFAULT_FLOWMON_FILE: &str = "manet-routing-compare.flowmon";
/// Placeholder for the simulator's protocol code in command templates.
pub const PROTOCOL_PARAM: &str = "protocol";
/// Placeholder for the protocol name in command templates.
pub const PROTOCOL_NAME_PARAM: &str = "protocol_name";
/// Placeholder for the random seed in command templates.
pub const SEED_PARAM: &str = "seed";

const SEED_STEP: u64 = 1_234_122;
const SEED_OFFSET: u64 = 23;

fn default_flowmon_file() -> String {
    String::from(DEFAULT_FLOWMON_FILE)
}

fn default_averages() -> usize {
    1
}

///Structure that holds the data of a sweep specification.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SweepSpec {
    ///Name of the sweep. Used to name the results file.
    pub name: String,
    /// Simulator program and arguments. Arguments may contain `{name}` placeholders for any
    /// parameter, plus `{protocol}`, `{protocol_name}` and `{seed}`.
    pub command: Vec<String>,
    /// Protocols to compare.
    pub protocols: Vec<Dialect>,
    /// Parameters that stay fixed across the sweep.
    #[serde(default)]
    pub base_params: BTreeMap<String, toml::Value>,
    /// Name of the parameter that varies.
    pub moving_param: String,
    /// Values the moving parameter takes.
    pub moving_values: Vec<toml::Value>,
    /// Runs averaged for each (protocol, value) point.
    #[serde(default = "default_averages")]
    pub averages: usize,
    /// Flow monitor file the simulator writes into the work directory.
    #[serde(default = "default_flowmon_file")]
    pub flowmon_file: String,
    /// Data flow threshold. The analysis configuration's value is used when absent.
    pub data_flow_threshold: Option<u64>,
}

/// Renders a parameter value the way it is passed on the command line.
pub fn param_text(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl SweepSpec {
    /// This function takes a path to a file that defines a TOML-based sweep specification.
    pub fn parse_sweep_spec(file_path: &str) -> Result<SweepSpec, AnalysisError> {
        let mut file_content = String::new();

        let mut file = File::open(file_path).map_err(|e| {
            let err_msg = format!("Failed to open sweep file {}", file_path);
            AnalysisError {
                kind: AnalysisErrorKind::Configuration(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;

        let _bytes_read = file.read_to_string(&mut file_content).map_err(|e| {
            let err_msg = String::from("Failed to read sweep file content");
            AnalysisError {
                kind: AnalysisErrorKind::Configuration(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;

        SweepSpec::from_toml(&file_content)
    }

    /// Parses and validates a TOML sweep specification.
    pub fn from_toml(content: &str) -> Result<SweepSpec, AnalysisError> {
        let spec: SweepSpec = toml::from_str(content).map_err(|e| {
            let err_msg = String::from("Error parsing sweep spec");
            AnalysisError {
                kind: AnalysisErrorKind::Configuration(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;
        spec.validate()?;
        Ok(spec)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        let problem = if self.command.is_empty() {
            Some("command can't be empty")
        } else if self.protocols.is_empty() {
            Some("at least one protocol is needed")
        } else if self.moving_values.is_empty() {
            Some("moving_values can't be empty")
        } else if self.averages == 0 {
            Some("averages must be at least 1")
        } else {
            None
        };

        match problem {
            Some(p) => {
                let err_msg = format!("Invalid sweep {}: {}", self.name, p);
                Err(AnalysisErrorKind::Configuration(err_msg).into())
            }
            None => Ok(()),
        }
    }

    /// Random seed of the n-th run of a point.
    pub fn seed(run: usize) -> u64 {
        run as u64 * SEED_STEP + SEED_OFFSET
    }

    /// Parameters of one simulator run.
    pub fn run_params(
        &self,
        protocol: Dialect,
        value: &toml::Value,
        run: usize,
    ) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = self
            .base_params
            .iter()
            .map(|(k, v)| (k.clone(), param_text(v)))
            .collect();
        vars.insert(self.moving_param.clone(), param_text(value));
        vars.insert(
            PROTOCOL_PARAM.to_string(),
            protocol.simulator_code().to_string(),
        );
        vars.insert(PROTOCOL_NAME_PARAM.to_string(), protocol.to_string());
        vars.insert(SEED_PARAM.to_string(), SweepSpec::seed(run).to_string());
        vars
    }

    /// Fills the command template with the parameters of a run.
    pub fn render_command(
        &self,
        vars: &HashMap<String, String>,
    ) -> Result<Vec<String>, AnalysisError> {
        self.command
            .iter()
            .map(|arg| {
                strfmt(arg, vars).map_err(|e| {
                    let err_msg = format!("Could not bind parameters of argument \"{}\"", arg);
                    AnalysisError {
                        kind: AnalysisErrorKind::Configuration(err_msg),
                        cause: Some(Box::new(e)),
                    }
                })
            })
            .collect()
    }
}
