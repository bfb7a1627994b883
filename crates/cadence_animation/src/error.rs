//! Animation error types
//!
//! Ticking never fails; only array construction and config loading do.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CadenceError {
    /// The grid has no room along the axis the fill order walks
    #[error("Array grid needs at least one {axis}")]
    EmptyGridAxis { axis: &'static str },

    /// Stagger interval is negative, NaN or infinite
    #[error("Array interval must be finite and non-negative, got {0}")]
    InvalidInterval(f32),

    /// Failed to read a config file
    #[error("Failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a config file
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Failed to serialize a config
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, CadenceError>;
