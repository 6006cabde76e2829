//! Error types for the ROO engine

use thiserror::Error;

/// Result type alias for ROO engine operations
pub type Result<T> = std::result::Result<T, RooError>;

/// Errors that can occur while building range-of-outcomes projections
#[derive(Error, Debug)]
pub enum RooError {
    /// A required column is absent from an input table
    #[error("Missing column '{column}' in {table} table")]
    MissingColumn { table: String, column: String },

    /// Input data failed validation (empty tables, unknown positions, no position baseline)
    #[error("Data validation error: {0}")]
    DataValidation(String),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl RooError {
    /// Create a new missing column error
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn { table: table.into(), column: column.into() }
    }

    /// Create a new data validation error
    pub fn data_validation(msg: impl Into<String>) -> Self {
        Self::DataValidation(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
