use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV output error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Network,
    Io,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl LoadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LoadError::HttpError(_) => ErrorCategory::Network,
            LoadError::IoError(_) => ErrorCategory::Io,
            LoadError::SerializationError(_) | LoadError::CsvError(_) => ErrorCategory::Data,
            LoadError::ConfigError { .. }
            | LoadError::InvalidConfigValueError { .. }
            | LoadError::MissingConfigError { .. } => ErrorCategory::Config,
            LoadError::ProcessingError { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            LoadError::HttpError(_) => ErrorSeverity::Medium,
            LoadError::IoError(_) => ErrorSeverity::High,
            LoadError::SerializationError(_) | LoadError::CsvError(_) => ErrorSeverity::Medium,
            LoadError::ConfigError { .. }
            | LoadError::InvalidConfigValueError { .. }
            | LoadError::MissingConfigError { .. } => ErrorSeverity::High,
            LoadError::ProcessingError { .. } => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            LoadError::HttpError(_) => {
                "Check that the target URL is reachable and the request timeout is large enough"
                    .to_string()
            }
            LoadError::IoError(_) => {
                "Check that the output path exists and is writable".to_string()
            }
            LoadError::SerializationError(_) => {
                "The run summary could not be serialized; re-run with --verbose for details"
                    .to_string()
            }
            LoadError::CsvError(_) => {
                "The check table could not be written; re-run with --verbose for details"
                    .to_string()
            }
            LoadError::ConfigError { .. } => {
                "Review the scenario configuration for mistakes".to_string()
            }
            LoadError::InvalidConfigValueError { field, .. } => {
                format!("Correct the value of '{}' and try again", field)
            }
            LoadError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            LoadError::ProcessingError { .. } => {
                "Re-run the scenario; if this persists, file an issue with the log output"
                    .to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            LoadError::HttpError(e) => format!("Could not talk to the target: {}", e),
            LoadError::IoError(e) => format!("File operation failed: {}", e),
            LoadError::SerializationError(_) | LoadError::CsvError(_) => {
                "Report export failed".to_string()
            }
            LoadError::ConfigError { message } => format!("Configuration problem: {}", message),
            LoadError::InvalidConfigValueError {
                field,
                value,
                reason,
            } => format!("'{}' is not a valid {}: {}", value, field, reason),
            LoadError::MissingConfigError { field } => {
                format!("Configuration field '{}' is missing", field)
            }
            LoadError::ProcessingError { message } => message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;
