//! Error types for the EQTY API.

use eqty_core::{ChainError, EventError, MergeConflict, ValidationError};
use eqty_ecdsa::EcdsaError;
use thiserror::Error;

/// Errors that can occur across the EQTY crates.
#[derive(Debug, Error)]
pub enum EqtyError {
    /// Event error.
    #[error("event error: {0}")]
    Event(#[from] EventError),

    /// Chain error.
    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Signing or verification backend error.
    #[error("ecdsa error: {0}")]
    Ecdsa(#[from] EcdsaError),

    /// The anchor contract call failed.
    #[error("contract error: {0}")]
    Contract(#[source] anyhow::Error),

    /// No anchor contract is deployed on the network.
    #[error("Network ID {0} is not supported")]
    UnsupportedNetwork(u32),

    /// The call did not finish in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Invalid operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

impl EqtyError {
    /// The merge conflict behind this error, if any.
    pub fn as_merge_conflict(&self) -> Option<&MergeConflict> {
        match self {
            EqtyError::Chain(e) => e.as_merge_conflict(),
            _ => None,
        }
    }
}

/// Result type for EQTY operations.
pub type Result<T> = std::result::Result<T, EqtyError>;
