use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignitError {
    #[error("Unsupported input: {0}")]
    UnsupportedInput(String),

    #[error("Invalid PDF document: {0}")]
    InvalidDocument(String),

    #[error("Export failed: {0}")]
    ExportFailure(String),

    #[error("An export is already in progress")]
    ExportInProgress,

    #[error("Configuration error: {0}")]
    Config(String),
}
