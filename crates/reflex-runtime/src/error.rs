//! Error types for reflex-runtime

use thiserror::Error;

/// Result type for reflex-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or driving the engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    /// Core error
    #[error("core error: {0}")]
    Core(#[from] reflex_core::Error),
}

impl Error {
    /// Get the core error if this wraps one
    pub fn as_core(&self) -> Option<&reflex_core::Error> {
        match self {
            Error::Core(error) => Some(error),
            _ => None,
        }
    }
}
