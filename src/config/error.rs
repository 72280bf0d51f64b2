//! Error types for configuration loading and query expansion.

use std::path::PathBuf;

use thiserror::Error;

/// Malformed or contradictory input. Always fatal: raised before any fetch.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Nothing to search for or download.
    #[error(
        "no search terms: provide keywords, prefix/suffix keywords, a keywords file, url, similar_images or single_image"
    )]
    NoSearchTerms,

    /// A configuration document could not be read.
    #[error("cannot read {path}: {source}")]
    ReadFile {
        /// The file that failed to open.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// A configuration document is not valid JSON of the expected shape.
    #[error("cannot parse {path}: {source}")]
    Parse {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be turned into a query.
    #[error("invalid record #{index}: {source}")]
    Record {
        /// Zero-based position of the record in its document.
        index: usize,
        /// The underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },

    /// A config file has no `Records` array.
    #[error("{path} has no \"Records\" array")]
    MissingRecords {
        /// The offending file.
        path: PathBuf,
    },

    /// An option value is outside what the run can accept.
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// The option name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Creates a read error for `path`.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a parse error for `path`.
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid-value error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
