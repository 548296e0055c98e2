//! Runs the simulator over a grid of protocols and parameter values, and averages the flow
//! metrics of repeated runs with different seeds.

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

pub mod sweep_specification;

use self::sweep_specification::{param_text, SweepSpec};
use crate::config::AnalysisConfig;
use crate::flowmon::{read_flow_monitor, FlowMetrics};
use crate::routing::Dialect;
use crate::{AnalysisError, AnalysisErrorKind};
use slog::Logger;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Mean and standard error of one metric over the runs of a point.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Copy)]
pub struct MetricSummary {
    /// Mean over the runs
    pub mean: f64,
    /// Standard deviation over the runs divided by the square root of the number of runs
    pub std_error: f64,
    /// Number of runs the metric was defined for
    pub samples: usize,
}

/// Summarizes a series of measurements. NaN values are left out; None if nothing is left.
pub fn summarize(values: &[f64]) -> Option<MetricSummary> {
    let samples: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if samples.is_empty() {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(MetricSummary {
        mean,
        std_error: variance.sqrt() / n.sqrt(),
        samples: samples.len(),
    })
}

/// Summarizes every metric over a set of runs.
pub fn aggregate(runs: &[FlowMetrics]) -> BTreeMap<String, MetricSummary> {
    let mut series: BTreeMap<&'static str, Vec<f64>> = BTreeMap::new();
    for run in runs {
        for (name, value) in run.values() {
            series.entry(name).or_insert_with(Vec::new).push(value);
        }
    }

    series
        .into_iter()
        .filter_map(|(name, values)| summarize(&values).map(|s| (name.to_string(), s)))
        .collect()
}

/// Results of one (protocol, value) point of the sweep.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SweepPoint {
    /// Protocol simulated
    pub protocol: Dialect,
    /// Value of the moving parameter
    pub value: String,
    /// Metrics of every run
    pub runs: Vec<FlowMetrics>,
    /// Averaged metrics, by name
    pub metrics: BTreeMap<String, MetricSummary>,
}

/// Results of a whole sweep.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct SweepResults {
    /// Name of the sweep
    pub name: String,
    /// Parameter that varied
    pub moving_param: String,
    /// One entry per protocol and value, protocols in the order they were given
    pub points: Vec<SweepPoint>,
}

impl SweepResults {
    /// Mean of a metric for every value of a protocol, in sweep order.
    pub fn series(&self, protocol: Dialect, metric: &str) -> Vec<(String, Option<f64>)> {
        self.points
            .iter()
            .filter(|p| p.protocol == protocol)
            .map(|p| (p.value.clone(), p.metrics.get(metric).map(|s| s.mean)))
            .collect()
    }
}

/// Runs the simulations of a sweep inside a work directory.
#[derive(Debug)]
pub struct Sweep {
    spec: SweepSpec,
    work_dir: PathBuf,
    threshold: u64,
    logger: Logger,
}

impl Sweep {
    /// Creates a sweep. The data flow threshold of the sweep takes precedence over the one of
    /// the configuration.
    pub fn new<P: AsRef<Path>>(
        spec: SweepSpec,
        work_dir: P,
        config: &AnalysisConfig,
        logger: Logger,
    ) -> Sweep {
        let threshold = spec
            .data_flow_threshold
            .unwrap_or(config.data_flow_threshold);
        Sweep {
            spec,
            work_dir: work_dir.as_ref().to_path_buf(),
            threshold,
            logger,
        }
    }

    /// Path of the results file.
    pub fn results_file(&self) -> PathBuf {
        self.work_dir
            .join(format!("{}_results.json", self.spec.name))
    }

    /// Runs every point of the sweep sequentially.
    pub fn run(&self) -> Result<SweepResults, AnalysisError> {
        fs::create_dir_all(&self.work_dir).map_err(|e| {
            let err_msg = format!("Could not create work directory {}", self.work_dir.display());
            AnalysisError {
                kind: AnalysisErrorKind::IO(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;

        let total = self.spec.protocols.len() * self.spec.moving_values.len();
        info!(
            self.logger,
            "Sweep started";
            "name" => &self.spec.name,
            "points" => total,
            "averages" => self.spec.averages,
        );

        let mut points = Vec::with_capacity(total);
        for protocol in self.spec.protocols.iter().copied() {
            for value in self.spec.moving_values.iter() {
                let mut runs = Vec::with_capacity(self.spec.averages);
                for run in 0..self.spec.averages {
                    let metrics = self.run_once(protocol, value, run)?;
                    info!(
                        self.logger,
                        "Run finished";
                        "dialect" => protocol,
                        "param" => &self.spec.moving_param,
                        "value" => param_text(value),
                        "run" => run,
                        "loss_rate" => ?metrics.loss_rate,
                        "average_delay" => ?metrics.average_delay,
                    );
                    runs.push(metrics);
                }

                let metrics = aggregate(&runs);
                points.push(SweepPoint {
                    protocol,
                    value: param_text(value),
                    runs,
                    metrics,
                });
                debug!(
                    self.logger,
                    "Point averaged";
                    "dialect" => protocol,
                    "value" => param_text(value),
                    "done" => points.len(),
                    "points" => total,
                );
            }
        }

        Ok(SweepResults {
            name: self.spec.name.clone(),
            moving_param: self.spec.moving_param.clone(),
            points,
        })
    }

    fn run_once(
        &self,
        protocol: Dialect,
        value: &toml::Value,
        run: usize,
    ) -> Result<FlowMetrics, AnalysisError> {
        let vars = self.spec.run_params(protocol, value, run);
        let args = self.spec.render_command(&vars)?;
        let flowmon = self.work_dir.join(&self.spec.flowmon_file);

        //Stale output of a previous run must not be mistaken for this one's
        match fs::remove_file(&flowmon) {
            Err(ref e) if e.kind() != io::ErrorKind::NotFound => {
                warn!(self.logger, "Could not remove old flow monitor file"; "reason" => %e);
            }
            _ => {}
        }

        self.run_simulation(&args)?;
        let flows = read_flow_monitor(&flowmon)?;
        Ok(FlowMetrics::compute(&flows, self.threshold))
    }

    fn run_simulation(&self, args: &[String]) -> Result<(), AnalysisError> {
        let (program, program_args) = args.split_first().ok_or_else(|| {
            let err_msg = String::from("Empty simulator command");
            AnalysisError::from(AnalysisErrorKind::Configuration(err_msg))
        })?;
        debug!(self.logger, "Starting simulator"; "command" => args.join(" "));

        let output = Command::new(program)
            .args(program_args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                let err_msg = format!("Failed to spawn simulator process {}", program);
                AnalysisError {
                    kind: AnalysisErrorKind::Simulation(err_msg),
                    cause: Some(Box::new(e)),
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let err_msg = format!(
                "Simulator exited with {}: {}",
                output.status,
                stderr.lines().last().unwrap_or("")
            );
            return Err(AnalysisErrorKind::Simulation(err_msg).into());
        }

        Ok(())
    }

    /// Writes the results as JSON into the work directory and returns the file path.
    pub fn write_results(&self, results: &SweepResults) -> Result<PathBuf, AnalysisError> {
        let file_path = self.results_file();
        let data = serde_json::to_string_pretty(results).map_err(|e| {
            let err_msg = String::from("Failed to serialize sweep results");
            AnalysisError {
                kind: AnalysisErrorKind::Serialization(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;
        fs::write(&file_path, data).map_err(|e| {
            let err_msg = format!("Failed to write {}", file_path.display());
            AnalysisError {
                kind: AnalysisErrorKind::IO(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;
        info!(self.logger, "Sweep results written"; "file" => %file_path.display());

        Ok(file_path)
    }
}
