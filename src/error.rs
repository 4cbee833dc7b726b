//! Error types for the cache
//!
//! Provides unified error handling using thiserror. Cache operations themselves
//! are total and never fail; only configuration loading can go wrong.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache crate.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A configuration value was present but unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration document could not be parsed
    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache crate.
pub type Result<T> = std::result::Result<T, CacheError>;
