//*****************
//External crates
//*****************
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate slog;

//*****************
//Modules declaration
//*****************
pub mod common;
pub mod config;
pub mod flowmon;
pub mod logging;
pub mod mobility;
pub mod replay;
pub mod routing;
pub mod sweep;
pub mod trace;

//*****************
//Errors
//*****************
use std::error::Error;
use std::fmt;

/// Error struct for this crate
#[derive(Debug)]
pub struct AnalysisError {
    pub cause: Option<Box<dyn Error>>,
    pub kind: AnalysisErrorKind,
}

/// Types of errors produced in this crate
#[derive(Debug)]
pub enum AnalysisErrorKind {
    /// None of the known routing-table dialects was found in the dump header
    UnknownDialect(String),
    /// The requested timestamp has no routing-table block
    SnapshotNotFound(String),
    /// A node header did not carry the timestamp being parsed
    Desynchronized(String),
    /// Malformed input in one of the simulator output files
    Parsing(String),
    /// Failures in configuration of the system
    Configuration(String),
    /// Failures of the external simulator process
    Simulation(String),
    /// Failures related to [de]serializing data
    Serialization(String),
    /// File system errors
    IO(String),
}

impl Error for AnalysisError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.cause {
            Some(ref cause) => Some(&**cause),
            None => None,
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Display for AnalysisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnalysisErrorKind::UnknownDialect(msg) => write!(f, "{}", msg),
            AnalysisErrorKind::SnapshotNotFound(msg) => write!(f, "{}", msg),
            AnalysisErrorKind::Desynchronized(msg) => write!(f, "{}", msg),
            AnalysisErrorKind::Parsing(msg) => write!(f, "{}", msg),
            AnalysisErrorKind::Configuration(msg) => write!(f, "{}", msg),
            AnalysisErrorKind::Simulation(msg) => write!(f, "{}", msg),
            AnalysisErrorKind::Serialization(msg) => write!(f, "{}", msg),
            AnalysisErrorKind::IO(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<AnalysisErrorKind> for AnalysisError {
    fn from(kind: AnalysisErrorKind) -> AnalysisError {
        AnalysisError { cause: None, kind }
    }
}

/// Reads a whole simulator output file into memory.
pub fn read_file<P: AsRef<std::path::Path>>(path: P) -> Result<String, AnalysisError> {
    std::fs::read_to_string(path.as_ref()).map_err(|e| {
        let err_msg = format!("Failed to read {}", path.as_ref().display());
        AnalysisError {
            kind: AnalysisErrorKind::IO(err_msg),
            cause: Some(Box::new(e)),
        }
    })
}
