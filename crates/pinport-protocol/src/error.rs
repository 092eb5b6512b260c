//! Error types for protocol field conversion

use thiserror::Error;

/// Errors raised when a raw wire field has no typed rendering
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// Pull configuration byte outside the defined range
    #[error("invalid pull value: {0}")]
    Pull(u8),

    /// Parity byte outside the defined range
    #[error("invalid parity value: {0}")]
    Parity(u8),
}
