//! Error taxonomy for the fusion and evaluation core.
//!
//! `DataError` is fatal for the offending file, `ConfigError` is raised at
//! invocation time before any file is touched. Degenerate inputs are not
//! errors; they are logged and handled with fallback values.

use std::path::{Path, PathBuf};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("input file not found: {}", .path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: record {index}: missing required field `{field}`", .path.display())]
    MissingField {
        path: PathBuf,
        index: usize,
        field: &'static str,
    },

    #[error("{}: duplicate qid {qid} (records {first} and {second})", .path.display())]
    DuplicateQuery {
        path: PathBuf,
        qid: String,
        first: usize,
        second: usize,
    },

    #[error("invalid document id `{value}`: {reason}")]
    InvalidDocumentId { value: String, reason: &'static str },

    #[error("qid `{value}` is not an integer")]
    NonIntegerQuery { value: String },

    #[error("{}: {detail}", .path.display())]
    Malformed { path: PathBuf, detail: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown fusion strategy `{0}` (expected sum, product, product_rank or product_bm25_rank)")]
    UnknownStrategy(String),

    #[error("top-k must be positive")]
    NonPositiveTopK,

    #[error("weight for source {index} is not a finite number: {value}")]
    NonFiniteWeight { index: usize, value: f64 },

    #[error("{strategy} fusion needs exactly {expected} sources, got {actual}")]
    SourceCount {
        strategy: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("fusion needs at least one source")]
    NoSources,

    #[error("{0} weights given for {1} sources")]
    WeightCount(usize, usize),
}

impl DataError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            return Self::MissingFile {
                path: path.to_path_buf(),
            };
        }
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}
