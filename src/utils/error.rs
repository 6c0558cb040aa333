use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Backend responded with status {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Local state error: {message}")]
    LocalStateError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Not found: {what}")]
    NotFound { what: String },
}

/// 對應錯誤分類：傳輸、後端、本地狀態、驗證、配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Backend,
    LocalState,
    Validation,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationError {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound { what: what.into() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::ApiError(_) => ErrorCategory::Transport,
            AppError::BackendError { .. } => ErrorCategory::Backend,
            AppError::CsvError(_)
            | AppError::IoError(_)
            | AppError::SerializationError(_)
            | AppError::LocalStateError { .. } => ErrorCategory::LocalState,
            AppError::ValidationError { .. } | AppError::NotFound { .. } => {
                ErrorCategory::Validation
            }
            AppError::ConfigError { .. }
            | AppError::ConfigValidationError { .. }
            | AppError::InvalidConfigValueError { .. }
            | AppError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::Low,
            ErrorCategory::Transport | ErrorCategory::Backend => ErrorSeverity::Medium,
            ErrorCategory::LocalState => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// 給使用者看的訊息，後端有回傳原因時直接使用
    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::ApiError(e) if e.is_timeout() => {
                "The server did not respond in time".to_string()
            }
            AppError::ApiError(_) => "Could not reach the server".to_string(),
            AppError::BackendError { message, .. } => message.clone(),
            AppError::ValidationError { message } => message.clone(),
            AppError::NotFound { what } => format!("{} was not found", what),
            AppError::LocalStateError { message } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Transport => "Check that the backend is running and the API base URL is correct",
            ErrorCategory::Backend => "Review the backend message; the pending batch was left unchanged",
            ErrorCategory::LocalState => "Check that the data directory is writable",
            ErrorCategory::Validation => "Check the command arguments and the pending batch contents",
            ErrorCategory::Configuration => "Fix the configuration file or command-line overrides",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_and_severity() {
        let err = AppError::BackendError {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Backend);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.user_friendly_message(), "boom");

        let err = AppError::validation("select at least one row");
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.severity(), ErrorSeverity::Low);

        let err = AppError::MissingConfigError {
            field: "api.base_url".to_string(),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_local_state_errors_are_high_severity() {
        let err: AppError = serde_json::from_str::<Vec<u8>>("not json").unwrap_err().into();
        assert_eq!(err.category(), ErrorCategory::LocalState);
        assert_eq!(err.severity(), ErrorSeverity::High);
    }
}
