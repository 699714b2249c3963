use thiserror::Error;

use storm_core::StormError;

/// Errors that can occur in the insight pipeline.
#[derive(Error, Debug)]
pub enum InsightError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("payload has no timestamp")]
    MissingTimestamp,
    #[error("corpus load failure: {0}")]
    CorpusLoad(String),
    #[error("subject list error: {0}")]
    SubjectList(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for InsightError {
    fn from(err: serde_json::Error) -> Self {
        InsightError::MalformedPayload(err.to_string())
    }
}

impl From<InsightError> for StormError {
    fn from(err: InsightError) -> Self {
        match err {
            InsightError::Io(e) => StormError::Io(e),
            InsightError::SubjectList(msg) => StormError::SubjectList(msg),
            other => StormError::InvalidInput(other.to_string()),
        }
    }
}
