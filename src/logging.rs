//! Module related to creating the analysis logs and reading them back.

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

use crate::{AnalysisError, AnalysisErrorKind};
use slog::{Drain, Logger};
use std::fs::{File, OpenOptions};
use std::io;
use std::io::BufRead;
use std::path::Path;

/// Directory name for where the logs will be placed.
pub const LOG_DIR_NAME: &str = "log";
/// Default log file name for the command line tool
pub const DEFAULT_ANALYSIS_LOG: &str = "Analysis.log";
const LOG_CHANNEL_SIZE: usize = 512; //Default is 128
const LOG_THREAD_NAME: &str = "LoggerThread";

/// Struct that encapsulates a log entry
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    /// Main log message
    pub msg: String,
    /// Logging level
    pub level: String,
    /// Timestamp of the event
    pub ts: String,
    /// Simulation time the record refers to
    pub time: Option<f64>,
    /// Routing protocol the record refers to
    pub dialect: Option<String>,
    /// Number of nodes involved
    pub nodes: Option<usize>,
    /// Source node of a route query
    pub src: Option<usize>,
    /// Destination node of a route query
    pub dst: Option<usize>,
    /// Sweep run the record belongs to
    pub run: Option<usize>,
}

///Loads a log file and produces an array of log records for processing.
pub fn get_log_records_from_file<P: AsRef<Path>>(path: P) -> Result<Vec<LogEntry>, io::Error> {
    let file = File::open(path)?;
    let mut records = Vec::new();
    let reader = io::BufReader::new(file);

    for line in reader.lines() {
        let data = line?;
        let u: LogEntry = serde_json::from_str(&data)?;
        records.push(u);
    }

    Ok(records)
}

///Returns the first log record with the given message.
pub fn find_record_by_msg<'a>(msg: &str, records: &'a [LogEntry]) -> Option<&'a LogEntry> {
    records.iter().find(|rec| rec.msg == msg)
}

/// Create a duplicate logger for the terminal and the file passed as parameter.
pub fn create_logger<P: AsRef<Path>>(
    log_file_name: P,
    log_term: bool,
) -> Result<Logger, AnalysisError> {
    //Make sure the full path is valid
    if let Some(parent) = log_file_name.as_ref().parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            let err_msg = format!("Could not create log directory {}", parent.display());
            AnalysisError {
                kind: AnalysisErrorKind::IO(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;
    }

    let log_file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_file_name.as_ref())
        .map_err(|e| {
            let err_msg = format!("Could not open log file {}", log_file_name.as_ref().display());
            AnalysisError {
                kind: AnalysisErrorKind::IO(err_msg),
                cause: Some(Box::new(e)),
            }
        })?;

    if log_term {
        Ok(create_term_and_file_logger(log_file))
    } else {
        Ok(create_file_logger(log_file))
    }
}

fn create_file_logger(log_file: File) -> Logger {
    let d2 = slog_json::Json::new(log_file)
        .add_default_keys()
        .build()
        .fuse();
    let d2 = slog_async::Async::new(d2)
        .chan_size(LOG_CHANNEL_SIZE)
        .overflow_strategy(slog_async::OverflowStrategy::Block)
        .thread_name(format!("File{}", LOG_THREAD_NAME))
        .build()
        .fuse();

    Logger::root(d2, o!())
}

fn create_term_and_file_logger(log_file: File) -> Logger {
    //Create the terminal drain
    let decorator = slog_term::TermDecorator::new().build();
    let d1 = slog_term::CompactFormat::new(decorator).build().fuse();
    let d1 = slog_async::Async::new(d1)
        .chan_size(LOG_CHANNEL_SIZE)
        .overflow_strategy(slog_async::OverflowStrategy::Block)
        .thread_name(format!("Term{}", LOG_THREAD_NAME))
        .build()
        .fuse();

    //Create the file drain
    let d2 = slog_json::Json::new(log_file)
        .add_default_keys()
        .build()
        .fuse();
    let d2 = slog_async::Async::new(d2)
        .chan_size(LOG_CHANNEL_SIZE)
        .overflow_strategy(slog_async::OverflowStrategy::Block)
        .thread_name(format!("File{}", LOG_THREAD_NAME))
        .build()
        .fuse();

    //Fuse the drains and create the logger
    Logger::root(slog::Duplicate::new(d1, d2).fuse(), o!())
}

/// Creates a logger that discards all records. Used for tests that don't need logs.
pub fn create_discard_logger() -> Logger {
    Logger::root(slog::Discard, o!())
}
