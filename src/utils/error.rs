use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("HTTP request to {url} returned status {status}")]
    HttpStatusError { url: String, status: u16 },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Malformed input at line {line}: {message}")]
    MalformedError { line: usize, message: String },

    #[error("Parser {parser} failed: {source}")]
    ExecutionError {
        parser: String,
        #[source]
        source: Arc<DataError>,
    },

    #[error("Worker running parser {parser} panicked: {message}")]
    WorkerPanicked { parser: String, message: String },

    #[error("Gave up waiting for parser {parser} after {waited:?}")]
    Interrupted { parser: String, waited: Duration },

    #[error("Parser {parser} was never executed")]
    NotStarted { parser: String },

    #[error("Parser {parser} has already been executed")]
    AlreadyStarted { parser: String },

    #[error("Worker pool is closed")]
    PoolClosed,

    #[error("No async runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DataError {
    /// Wraps a failure raised inside a parser so the caller sees which parser produced it.
    pub fn execution(parser: impl Into<String>, source: Arc<DataError>) -> Self {
        DataError::ExecutionError {
            parser: parser.into(),
            source,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            DataError::Interrupted { .. } => ErrorSeverity::Low,
            DataError::HttpError(_) | DataError::HttpStatusError { .. } => ErrorSeverity::Medium,
            DataError::ExecutionError { source, .. } => source.severity(),
            DataError::WorkerPanicked { .. }
            | DataError::PoolClosed
            | DataError::NoRuntime(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DataError::HttpError(_) => "Check the network connection and that the URL is reachable",
            DataError::HttpStatusError { .. } => "Check that the URL points at an existing resource",
            DataError::IoError(_) => "Check that the source file exists and is readable",
            DataError::CsvError(_) => "Check the delimiter and header settings for this source",
            DataError::SerializationError(_) | DataError::MalformedError { .. } => {
                "Check that the source content matches the selected format"
            }
            DataError::ExecutionError { source, .. } => source.recovery_suggestion(),
            DataError::Interrupted { .. } => "Increase the timeout or retry later",
            DataError::ConfigValidationError { .. }
            | DataError::InvalidConfigValueError { .. }
            | DataError::MissingConfigError { .. } => "Fix the configuration and run again",
            _ => "This is an internal error; please report it",
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
