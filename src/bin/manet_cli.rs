#[macro_use]
extern crate slog;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use manet_analysis::common::parse_sim_time;
use manet_analysis::config::AnalysisConfig;
use manet_analysis::flowmon::{self, FlowMetrics};
use manet_analysis::logging;
use manet_analysis::mobility;
use manet_analysis::replay;
use manet_analysis::routing::loader::TableLoader;
use manet_analysis::sweep::sweep_specification::SweepSpec;
use manet_analysis::sweep::Sweep;
use manet_analysis::trace;
use manet_analysis::{AnalysisError, AnalysisErrorKind};
use slog::Logger;
use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

const ARG_CONFIG: &str = "config";
const ARG_LOG_FILE: &str = "log_file";
const ARG_TERMINAL_LOG: &str = "term_log";
const ARG_TABLE: &str = "table";
const ARG_TIME: &str = "time";
const ARG_NODES: &str = "nodes";
const ARG_SOURCE: &str = "src";
const ARG_DESTINATION: &str = "dst";
const ARG_FILE: &str = "file";
const ARG_THRESHOLD: &str = "threshold";
const ARG_PRINT: &str = "print";
const ARG_STATES: &str = "states";
const ARG_OUTPUT: &str = "out";
const ARG_SPEC: &str = "spec";
const ARG_WORK_DIR: &str = "dir";

const CMD_ROUTE: &str = "route";
const CMD_FLOWS: &str = "flows";
const CMD_OVERHEAD: &str = "overhead";
const CMD_REPLAY: &str = "replay";
const CMD_SWEEP: &str = "sweep";

const ERROR_LOG_INITIALIZATION: i32 = 1;
const ERROR_EXECUTION_FAILURE: i32 = 2;

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, AnalysisError> {
    matches.value_of(name).ok_or_else(|| {
        let err_msg = format!("Missing argument {}", name);
        AnalysisError::from(AnalysisErrorKind::Configuration(err_msg))
    })
}

fn parse_arg<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<T, AnalysisError> {
    let value = required(matches, name)?;
    value.parse::<T>().map_err(|_| {
        let err_msg = format!("Invalid value \"{}\" for argument {}", value, name);
        AnalysisErrorKind::Configuration(err_msg).into()
    })
}

/// Value of a global argument, given either before or after the subcommand.
fn global_value<'a>(matches: &'a ArgMatches, name: &str) -> Option<&'a str> {
    matches
        .value_of(name)
        .or_else(|| matches.subcommand().1.and_then(|sub| sub.value_of(name)))
}

fn format_metric(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => String::from("n/a"),
    }
}

fn command_route(
    matches: &ArgMatches,
    config: &AnalysisConfig,
    logger: &Logger,
) -> Result<(), AnalysisError> {
    let table_file = required(matches, ARG_TABLE)?;
    let time_arg = required(matches, ARG_TIME)?;
    let time = parse_sim_time(time_arg).ok_or_else(|| {
        let err_msg = format!("Invalid simulation time {}", time_arg);
        AnalysisError::from(AnalysisErrorKind::Configuration(err_msg))
    })?;
    let nodes: usize = parse_arg(matches, ARG_NODES)?;
    let src: usize = parse_arg(matches, ARG_SOURCE)?;
    let dst: usize = parse_arg(matches, ARG_DESTINATION)?;

    let loader = TableLoader::from_config(config, logger.clone())?;
    let snapshot = loader.load_file(table_file, time, nodes)?;
    let route = snapshot.get_route(src, dst);

    info!(
        logger,
        "Route computed";
        "time" => time,
        "dialect" => snapshot.dialect,
        "nodes" => nodes,
        "src" => src,
        "dst" => dst,
        "hops" => route.as_ref().map(|r| r.len() - 1),
    );

    match route {
        Some(r) => {
            let hops: Vec<String> = r.iter().map(|n| n.to_string()).collect();
            println!("{}", hops.join(" -> "));
        }
        None => println!("No route from {} to {} at {}s", src, dst, time),
    }

    Ok(())
}

fn command_flows(
    matches: &ArgMatches,
    config: &AnalysisConfig,
    logger: &Logger,
) -> Result<(), AnalysisError> {
    let file = required(matches, ARG_FILE)?;
    let threshold: u64 = match matches.value_of(ARG_THRESHOLD) {
        Some(_) => parse_arg(matches, ARG_THRESHOLD)?,
        None => config.data_flow_threshold,
    };

    let flows = flowmon::read_flow_monitor(file)?;
    let metrics = FlowMetrics::compute(&flows, threshold);
    info!(
        logger,
        "Flow statistics processed";
        "flows" => flows.len(),
        "threshold" => threshold,
    );

    if matches.is_present(ARG_PRINT) {
        print!(
            "{}",
            flowmon::format_flows(&flows, flowmon::data_flows(threshold))
        );
    }
    println!("Loss Rate: {}", format_metric(metrics.loss_rate));
    println!("Average Delay(s): {}", format_metric(metrics.average_delay));
    println!("Goodput(kbps): {}", format_metric(metrics.goodput_kbps));
    println!("Rx Packets: {}", metrics.rx_packets);
    println!("Control Rx Packets: {}", metrics.control_packets);
    println!(
        "Control Overhead: {}",
        format_metric(metrics.control_overhead)
    );

    Ok(())
}

fn command_overhead(
    matches: &ArgMatches,
    config: &AnalysisConfig,
    logger: &Logger,
) -> Result<(), AnalysisError> {
    let file = required(matches, ARG_FILE)?;
    let plan = config.address_plan()?;
    let text = manet_analysis::read_file(file)?;
    let (dialect, summary) = trace::summarize(&text, &plan)?;
    let overhead = summary.routing_overhead()?;

    info!(
        logger,
        "Routing overhead computed";
        "dialect" => dialect,
        "routing_tx" => summary.routing.len(),
        "payload_tx" => summary.payload.len(),
        "overhead" => overhead,
    );
    println!("Routing overhead ({}): {}", dialect, overhead);

    Ok(())
}

fn command_replay(
    matches: &ArgMatches,
    config: &AnalysisConfig,
    logger: &Logger,
) -> Result<(), AnalysisError> {
    let states = mobility::read_state_log(required(matches, ARG_STATES)?)?;
    let table_text = manet_analysis::read_file(required(matches, ARG_TABLE)?)?;
    let loader = TableLoader::from_config(config, logger.clone())?;
    let frames = replay::build_frames(&states, &table_text, &loader, logger)?;

    match matches.value_of(ARG_OUTPUT) {
        Some(out) => replay::write_frames_to_file(&frames, out),
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            replay::write_frames(&frames, &mut handle)
        }
    }
}

fn command_sweep(
    matches: &ArgMatches,
    config: &AnalysisConfig,
    logger: &Logger,
) -> Result<(), AnalysisError> {
    let spec = SweepSpec::parse_sweep_spec(required(matches, ARG_SPEC)?)?;
    let work_dir = matches.value_of(ARG_WORK_DIR).unwrap_or(".");
    let sweep = Sweep::new(spec, work_dir, config, logger.clone());
    let results = sweep.run()?;
    let file = sweep.write_results(&results)?;
    println!("{}", file.display());

    Ok(())
}

fn run(matches: &ArgMatches, config: &AnalysisConfig, logger: &Logger) -> Result<(), AnalysisError> {
    match matches.subcommand() {
        (CMD_ROUTE, Some(sub)) => command_route(sub, config, logger),
        (CMD_FLOWS, Some(sub)) => command_flows(sub, config, logger),
        (CMD_OVERHEAD, Some(sub)) => command_overhead(sub, config, logger),
        (CMD_REPLAY, Some(sub)) => command_replay(sub, config, logger),
        (CMD_SWEEP, Some(sub)) => command_sweep(sub, config, logger),
        (other, _) => {
            let err_msg = format!("Unknown command {}", other);
            Err(AnalysisErrorKind::Configuration(err_msg).into())
        }
    }
}

fn init(matches: &ArgMatches) -> Result<(AnalysisConfig, Logger), AnalysisError> {
    let config = match global_value(matches, ARG_CONFIG) {
        Some(file) => AnalysisConfig::parse_config(file)?,
        None => AnalysisConfig::default(),
    };

    //Should we log to the terminal
    let log_term: bool = global_value(matches, ARG_TERMINAL_LOG)
        .unwrap_or("false")
        .parse()
        .unwrap_or(false);

    let log_file = match global_value(matches, ARG_LOG_FILE) {
        Some(f) => PathBuf::from(f),
        None => PathBuf::from(logging::LOG_DIR_NAME).join(logging::DEFAULT_ANALYSIS_LOG),
    };
    let logger = logging::create_logger(&log_file, log_term)?;
    debug!(logger, "Configuration loaded"; "node_subnet" => &config.node_subnet);

    Ok((config, logger))
}

fn get_cli_parameters<'a>() -> ArgMatches<'a> {
    let file_arg = |name: &'static str, help: &'static str| {
        Arg::with_name(name)
            .long(name)
            .value_name("FILE")
            .help(help)
            .takes_value(true)
            .required(true)
    };

    App::new("manet_cli")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Marco Caballero <marco.caballero@cl.cam.ac.uk>")
        .about("Post-processing of MANET routing simulations")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name(ARG_CONFIG)
                .short("c")
                .long(ARG_CONFIG)
                .value_name("FILE")
                .help("TOML file with the analysis configuration.")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name(ARG_LOG_FILE)
                .long(ARG_LOG_FILE)
                .value_name("FILE")
                .help("File the JSON log records are written to.")
                .takes_value(true)
                .global(true),
        )
        .arg(
            Arg::with_name(ARG_TERMINAL_LOG)
                .long("log_to_terminal")
                .value_name("true/false")
                .help("Should the tool log operations to the terminal as well")
                .takes_value(true)
                .global(true),
        )
        .subcommand(
            SubCommand::with_name(CMD_ROUTE)
                .about("Reconstructs the route between two nodes at a point in time.")
                .arg(file_arg(ARG_TABLE, "Routing table dump of the simulation."))
                .arg(
                    Arg::with_name(ARG_TIME)
                        .long(ARG_TIME)
                        .value_name("TIME")
                        .help("Simulation time of the tables, e.g. 2 or +2s.")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name(ARG_NODES)
                        .long(ARG_NODES)
                        .value_name("N")
                        .help("Number of nodes in the simulation.")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name(ARG_SOURCE)
                        .long(ARG_SOURCE)
                        .value_name("NODE")
                        .help("Source node id.")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name(ARG_DESTINATION)
                        .long(ARG_DESTINATION)
                        .value_name("NODE")
                        .help("Destination node id.")
                        .takes_value(true)
                        .required(true),
                ),
        )
        .subcommand(
            SubCommand::with_name(CMD_FLOWS)
                .about("Computes loss, delay and overhead metrics from flow monitor output.")
                .arg(file_arg(ARG_FILE, "Flow monitor XML file."))
                .arg(
                    Arg::with_name(ARG_THRESHOLD)
                        .long(ARG_THRESHOLD)
                        .value_name("PACKETS")
                        .help("Flows that sent more packets than this are data flows.")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name(ARG_PRINT)
                        .long(ARG_PRINT)
                        .help("Print the data flows before the metrics."),
                ),
        )
        .subcommand(
            SubCommand::with_name(CMD_OVERHEAD)
                .about("Computes the routing overhead of an ASCII packet trace.")
                .arg(file_arg(ARG_FILE, "ASCII trace file.")),
        )
        .subcommand(
            SubCommand::with_name(CMD_REPLAY)
                .about("Joins node positions and flow routes second by second.")
                .arg(file_arg(ARG_STATES, "Network state log of the simulation."))
                .arg(file_arg(ARG_TABLE, "Routing table dump of the simulation."))
                .arg(
                    Arg::with_name(ARG_OUTPUT)
                        .long(ARG_OUTPUT)
                        .value_name("FILE")
                        .help("File the frames are written to. Defaults to stdout.")
                        .takes_value(true),
                ),
        )
        .subcommand(
            SubCommand::with_name(CMD_SWEEP)
                .about("Runs a parameter sweep of the simulator and averages its metrics.")
                .arg(file_arg(ARG_SPEC, "TOML sweep specification."))
                .arg(
                    Arg::with_name(ARG_WORK_DIR)
                        .long(ARG_WORK_DIR)
                        .value_name("WORK_DIR")
                        .help("Directory the simulator runs in and results are placed in.")
                        .takes_value(true),
                ),
        )
        .get_matches()
}

fn main() {
    //Enable the a more readable version of backtraces
    color_backtrace::install();

    //Build CLI interface
    let matches = get_cli_parameters();
    let (config, logger) = init(&matches).unwrap_or_else(|e| {
        eprintln!("manet_cli failed with the following error: {}", e);
        ::std::process::exit(ERROR_LOG_INITIALIZATION);
    });

    let result = run(&matches, &config, &logger);
    //Flush the pending log records
    drop(logger);

    if let Err(ref e) = result {
        eprintln!("manet_cli failed with the following error: {}", e);
        eprintln!("Error chain: ");
        let mut chain = e.source();
        while let Some(internal) = chain {
            eprintln!("Internal error: {}", internal);
            chain = internal.source();
        }

        ::std::process::exit(ERROR_EXECUTION_FAILURE);
    }
}
