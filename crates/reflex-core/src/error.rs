//! Error types for reflex-core

use crate::{DatumType, ScopeId};
use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: DatumType, got: DatumType },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Index {index} out of range for size {size}")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("Datum has no storage")]
    NullStorage,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Attribute collision: {0} is a prescribed attribute")]
    AttributeCollision(String),

    #[error("Unknown prototype: {0}")]
    UnknownPrototype(String),

    #[error("Scope not found: {0}")]
    ScopeNotFound(ScopeId),

    #[error("Attribute not found: {0}")]
    AttributeNotFound(String),

    #[error("Cannot parse {input:?} as {kind}")]
    Parse { kind: DatumType, input: String },
}

impl Error {
    pub(crate) fn mismatch(expected: DatumType, got: DatumType) -> Self {
        Error::TypeMismatch { expected, got }
    }

    pub(crate) fn external(operation: &str) -> Self {
        Error::UnsupportedOperation(format!("{} on external storage", operation))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
