//! Error types for the lineup simulator

use roo_engine::RooError;
use thiserror::Error;

/// Result type alias for lineup simulator operations
pub type Result<T> = std::result::Result<T, LineupSimError>;

/// Errors that can occur while simulating a contest
#[derive(Error, Debug)]
pub enum LineupSimError {
    /// A lineup names a player absent from the projections
    #[error("Lineup {lineup} references unknown player '{player}'")]
    UnknownPlayer { lineup: usize, player: String },

    /// A lineup row could not be read into nine slots
    #[error("Malformed lineup on row {row}: {reason}")]
    MalformedLineup { row: usize, reason: String },

    /// A payout line could not be parsed
    #[error("Invalid payout line {line}: {reason}")]
    InvalidPayout { line: usize, reason: String },

    /// Input data failed validation (empty pools, missing teams)
    #[error("Data validation error: {0}")]
    DataValidation(String),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Errors from the shared ROO primitives (missing columns, projection artifact)
    #[error(transparent)]
    Roo(#[from] RooError),

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

impl LineupSimError {
    pub fn unknown_player(lineup: usize, player: impl Into<String>) -> Self {
        Self::UnknownPlayer { lineup, player: player.into() }
    }

    pub fn malformed_lineup(row: usize, reason: impl Into<String>) -> Self {
        Self::MalformedLineup { row, reason: reason.into() }
    }

    pub fn invalid_payout(line: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPayout { line, reason: reason.into() }
    }

    pub fn data_validation(msg: impl Into<String>) -> Self {
        Self::DataValidation(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
