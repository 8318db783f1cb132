//! Common error types for sitelapse

use thiserror::Error;

/// Common result type for sitelapse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across sitelapse crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream payload could not be interpreted
    #[error("Upstream data error: {0}")]
    Upstream(String),

    /// Text or date parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
