// =============================================================================
// error.rs: THE TAXONOMY OF THINGS THAT GO WRONG
// =============================================================================
//
// Two kinds of failure live here.
//
// Fatal ones (bad configuration, a model that will not load, a whitelist
// that makes no sense) stop the run before the first sample is touched.
//
// Row-level ones (the extractor choking on one weird message) are caught by
// the batch driver, pinned to their row, and the batch keeps going.
// =============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{what} not found at {path}")]
    MissingPath { what: &'static str, path: PathBuf },

    #[error("similarity threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("worker count must be at least 1")]
    NoWorkers,

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// The entity model could not be loaded. Fatal, since every row needs it.
#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("entity model not found at {0}")]
    NotFound(PathBuf),

    #[error("failed to read entity model at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid pattern on line {line} of {path}: {source}")]
    BadPattern {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("entity model at {0} contains no patterns")]
    Empty(PathBuf),

    #[error("failed to build pattern automaton: {0}")]
    Automaton(String),
}

/// Key-word extraction failed for a single text.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("entity extraction failed: {0}")]
    Inference(String),
}

/// The whitelist table is unreadable or violates its invariants.
#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("whitelist entry {index} ({organization}) has no key words")]
    NoKeyWords { index: usize, organization: String },

    #[error("whitelist entry {index} ({organization}) has an unparsable site {site:?}")]
    BadSite {
        index: usize,
        organization: String,
        site: String,
    },
}

/// Reading or writing a JSON / JSON Lines table failed.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record in {path} (line {line}): {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize records for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Label conversion or gazetteer compilation failed.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("labelled task {index} is missing field {field}")]
    MissingField { index: usize, field: &'static str },

    #[error("training set has no usable entity spans")]
    NoSpans,

    #[error("failed to write model to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single sample could not be diagnosed. Never aborts the batch.
#[derive(Debug, Clone, Error)]
#[error("row {index}: {message}")]
pub struct RowError {
    pub index: usize,
    pub message: String,
}
