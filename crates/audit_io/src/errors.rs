//! Error taxonomy for filesystem, CSV, and JSON failures in `audit_io`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("io error reading/writing {path}: {source}")]
    Path {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("file {path} has duplicate header name {name:?}")]
    DuplicateHeader { path: String, name: String },

    #[error("file {path} is missing required header(s): {missing:?}")]
    MissingHeaders { path: String, missing: Vec<String> },

    #[error("json error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no file matching prefix {prefix:?} found under {dir}")]
    NoVersionedFile { dir: String, prefix: String },

    #[error("required file not found: {0}")]
    MissingRequiredFile(String),

    #[error("invalid audit seed in {path}: {raw:?}")]
    InvalidSeed { path: String, raw: String },
}

pub type IoResult<T> = Result<T, IoError>;
