use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading or writing the timer state file.
///
/// The scheduler treats every variant as "no prior state" and starts cold.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("failed to access state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file is empty")]
    Empty,

    #[error("state file has unexpected header '{0}'")]
    BadHeader(String),

    #[error("unsupported state file version {0}")]
    UnsupportedVersion(u32),

    #[error("malformed state record '{line}': {reason}")]
    MalformedRecord { line: String, reason: String },
}

/// Configuration could not be loaded or stored.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A reset rule string that does not follow `day/HH:MM` or `week/D/HH:MM`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PredicateError {
    #[error("unknown reset rule kind '{0}'")]
    UnknownKind(String),

    #[error("invalid time of day '{0}'")]
    InvalidTime(String),

    #[error("invalid weekday '{0}'")]
    InvalidWeekday(String),

    #[error("reset rule '{0}' has the wrong number of fields")]
    WrongArity(String),
}
