//! Error types for the secp256k1 backend.

use thiserror::Error;

/// Errors raised while hashing, signing or verifying typed data.
#[derive(Debug, Error)]
pub enum EcdsaError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The schema names a type this encoder does not support.
    #[error("unsupported type {kind} for field {field}")]
    UnsupportedType { field: String, kind: String },

    /// The value does not fit the field's declared type.
    #[error("value of field {field} does not match type {kind}")]
    TypeMismatch { field: String, kind: String },

    #[error("missing value for field {0}")]
    MissingField(String),

    #[error("unknown primary type {0}")]
    UnknownPrimaryType(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, EcdsaError>;
