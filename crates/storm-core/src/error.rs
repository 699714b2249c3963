use thiserror::Error;

/// Top-level error type for the Stormwatch system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for StormError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StormError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Subject list error: {0}")]
    SubjectList(String),
}

impl From<toml::de::Error> for StormError {
    fn from(err: toml::de::Error) -> Self {
        StormError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for StormError {
    fn from(err: serde_json::Error) -> Self {
        StormError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Stormwatch operations.
pub type Result<T> = std::result::Result<T, StormError>;
