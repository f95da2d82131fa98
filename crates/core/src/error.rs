//! `BufTune` Core Error System
//!
//! Errors are only raised at startup (configuration, accounting constants).
//! Observation-point entry points never return them: a failed probe or a
//! missing handle is reported as "no pressure" and the invocation ends there.

use thiserror::Error;

/// Core result type for fallible setup operations
pub type TunerResult<T> = Result<T, TunerError>;

/// Main error type for core operations
#[derive(Error, Debug)]
pub enum TunerError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Validation errors
    #[error("Validation failed for field '{field}': {reason}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Reason for validation failure
        reason: String,
    },

    /// Inconsistent memory-accounting constants
    #[error("Accounting error: {0}")]
    Accounting(#[from] AccountingError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TunerError {
    /// Create configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create validation error
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Memory-accounting unit descriptor errors (Copy for cheap propagation)
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccountingError {
    /// Unit size is zero or not a power of two
    #[error("{unit} size {size} is not a power of two")]
    NotPowerOfTwo {
        /// Unit name
        unit: &'static str,
        /// Offending size
        size: u64,
    },

    /// Shift exponent does not describe the unit size
    #[error("{unit} shift {shift} does not match size {size}")]
    ShiftMismatch {
        /// Unit name
        unit: &'static str,
        /// Linear size
        size: u64,
        /// Shift exponent
        shift: u32,
    },
}

/// Threshold probe failures
///
/// Consumed by the pressure evaluator, which turns every variant into
/// "not under pressure".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// Threshold source does not exist
    #[error("threshold source {source_name} unavailable")]
    Unavailable {
        /// Source description
        source_name: String,
    },

    /// Threshold source exists but could not be read
    #[error("threshold source {source_name} unreadable: {reason}")]
    Unreadable {
        /// Source description
        source_name: String,
        /// Reason for failure
        reason: String,
    },

    /// Threshold source content is not three integers
    #[error("threshold source {source_name} malformed: {reason}")]
    Malformed {
        /// Source description
        source_name: String,
        /// Reason for failure
        reason: String,
    },
}
