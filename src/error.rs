//! Error taxonomy. Only [`ConfigError`] and [`GatherError`] leave the pipeline; read and precheck
//! failures are absorbed into counters and logs.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::schema::ColumnType;

/// Fatal: the request cannot be interpreted at all.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no usable {level} selector (given: {given:?})")]
    NoValidSelectors { level: &'static str, given: Vec<String> },
    #[error("unsafe subfolder name: {0:?}")]
    UnsafeSubfolder(String),
    #[error("cannot read root {path}: {source}")]
    UnreadableRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("root is not a directory: {0}")]
    RootNotDirectory(PathBuf),
    #[error("column spec is empty")]
    EmptySpec,
    #[error("column name is empty")]
    EmptyColumnName,
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("unknown column type: {0:?}")]
    UnknownColumnType(String),
    #[error("invalid column declaration {0:?} (expected name:type[:required|optional][=default])")]
    InvalidColumnDecl(String),
    #[error("invalid {ty} default: {value:?}")]
    InvalidDefault { ty: ColumnType, value: String },
    #[error("invalid config file {path}: {message}")]
    InvalidConfigFile { path: PathBuf, message: String },
    #[error("invalid delimiter {0:?}: must be a single ASCII character")]
    InvalidDelimiter(String),
    #[error("invalid timeout {0}: must be a positive number of seconds")]
    InvalidTimeout(f64),
}

/// A file that could not be turned into a table. The file is excluded; the run continues.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: required column {column:?} missing")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path}: read exceeded {after:?}")]
    Timeout { path: PathBuf, after: Duration },
    #[error("{path}: reader thread panicked")]
    WorkerPanicked { path: PathBuf },
}

/// Why a header could not be inspected. Callers only see a bool; this is for logging.
#[derive(Debug, Error)]
pub enum PrecheckError {
    #[error("{path} is not a regular file")]
    NotAFile { path: PathBuf },
    #[error("open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("header of {path}: {source}")]
    Header {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Run-level failures other than configuration.
#[derive(Debug, Error)]
pub enum GatherError {
    #[error("run cancelled; {abandoned} in-flight reads abandoned")]
    Cancelled { abandoned: usize },
}
