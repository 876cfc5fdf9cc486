//! Error taxonomy for loading, classifying, building, writing, and validating.
//!
//! Loading and building failures are separate types so callers can tell a bad
//! input file apart from a column the engine could not describe.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("input file {0:?} was not found")]
    NotFound(PathBuf),

    #[error("input file {0:?} is empty")]
    Empty(PathBuf),

    #[error("input file {path:?} is not valid delimited data: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("unexpected I/O failure reading {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("cannot classify an empty column")]
    EmptyColumn,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("column '{column}' could not be classified")]
    Classify {
        column: String,
        #[source]
        source: ClassifyError,
    },

    #[error("column '{column}' appears more than once; names must be unique before building")]
    DuplicateColumn { column: String },

    #[error("column '{column}' has {actual} value(s) but the table has {expected} row(s)")]
    RaggedColumn {
        column: String,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("failed to load table")]
    Load(#[from] LoadError),

    #[error("failed to build schema")]
    Build(#[from] BuildError),
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("output directory {0:?} does not exist")]
    MissingDirectory(PathBuf),

    #[error("failed to write {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize {path:?}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("could not read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?} is not valid JSON")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("document does not conform ({} violation(s)): {}", .0.len(), .0.join("; "))]
    Violations(Vec<String>),
}

impl ValidationError {
    pub fn violations(&self) -> &[String] {
        match self {
            ValidationError::Violations(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path:?} is not valid YAML")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
