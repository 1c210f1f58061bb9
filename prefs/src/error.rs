//! Error types for loading and saving preferences.

use thiserror::Error;

/// Errors that can occur while reading, writing or validating preferences.
#[derive(Debug, Error)]
pub enum PrefsError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A value is outside its allowed range.
    #[error("invalid preferences: {0}")]
    Invalid(String),
}

/// Convenience alias for results with [`PrefsError`].
pub type Result<T> = std::result::Result<T, PrefsError>;
