use thiserror::Error;

/// Core error type shared across the omniture crates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A mandatory setting is absent or malformed; no fetch is attempted.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl Error {
    pub(crate) fn missing(field: &str) -> Self {
        Error::Configuration(format!("missing required field `{field}`"))
    }
}

/// Convenience alias for results returned by the omniture crates.
pub type Result<T> = std::result::Result<T, Error>;
