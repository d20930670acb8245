//! Error types for hotswap-registry.

use crate::core::Kind;
use std::fmt;
use std::path::PathBuf;

/// Result type alias for hotswap-registry operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when working with the registry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A key was declared again with a different kind.
    ///
    /// This is a programming defect; [`Registry::declare`](crate::core::Registry::declare)
    /// panics with this error's message.
    #[error(
        "Mismatch of kinds for key {key}. Existing kind: {existing}, requested kind: {requested} (declared at: {sites})"
    )]
    KindConflict {
        /// The conflicting key
        key: String,
        /// Kind the slot was created with
        existing: Kind,
        /// Kind requested by the later declaration
        requested: Kind,
        /// Declaration sites recorded so far, comma-separated
        sites: String,
    },

    /// A backing script file failed to evaluate.
    #[error("Failed to load ({}): {message}", file.display())]
    ScriptLoad {
        /// The file that failed
        file: PathBuf,
        /// Message reported by the script engine
        message: String,
    },

    /// A reload pass met a slot with no kind.
    #[error("Key {0} has the untyped kind; aborting reload pass")]
    UntypedSlot(String),

    /// File watching failed to initialize.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Configuration error: {0}")]
    Other(String),
}

/// Validation error for candidate slot values.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Custom validation error with a message.
    Custom(String),

    /// A numeric value fell outside its declared inclusive bounds.
    OutOfBounds {
        /// The rejected value, rendered as text
        value: String,
        /// Inclusive lower bound
        lower: String,
        /// Inclusive upper bound
        upper: String,
    },
}

impl ValidationError {
    /// Create a custom validation error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Create an out-of-bounds error.
    pub fn out_of_bounds(
        value: impl fmt::Display,
        lower: impl fmt::Display,
        upper: impl fmt::Display,
    ) -> Self {
        Self::OutOfBounds {
            value: value.to_string(),
            lower: lower.to_string(),
            upper: upper.to_string(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom(msg) => write!(f, "{}", msg),
            Self::OutOfBounds {
                value,
                lower,
                upper,
            } => {
                write!(
                    f,
                    "Value {} outside bounds [{}, {}]",
                    value, lower, upper
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}
