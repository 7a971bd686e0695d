//! Error types for qsift.
//!
//! Decoding and compiling never fail; these cover configuration, statement
//! rendering and database execution.

use thiserror::Error;

/// The main error type for qsift operations.
#[derive(Debug, Error)]
pub enum QsiftError {
    /// Table name was empty after sanitization.
    #[error("Invalid table name: '{0}'")]
    InvalidTable(String),

    /// Database connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed configuration file.
    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for qsift operations.
pub type QsiftResult<T> = Result<T, QsiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = QsiftError::InvalidTable("--".to_string());
        assert_eq!(err.to_string(), "Invalid table name: '--'");
    }
}
