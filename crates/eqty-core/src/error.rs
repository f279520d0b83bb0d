//! Error types for EQTY event chains.

use thiserror::Error;

use crate::crypto::KeccakHash;
use crate::merge::MergeConflict;
use crate::signer::BoxError;

/// Errors raised while building, encoding, signing or decoding a single event.
#[derive(Debug, Error)]
pub enum EventError {
    /// Payload and media type disagree.
    #[error("Unable to encode data as {0}")]
    Encoding(String),

    /// The canonical binary form needs fields that are not set yet.
    #[error("Event cannot be converted to binary: {0}")]
    IncompleteEvent(&'static str),

    /// A length-prefixed field does not fit its prefix.
    #[error("{field} too long: exceeds {limit}")]
    TooLarge {
        field: &'static str,
        limit: &'static str,
    },

    /// Typed data for signing needs fields that are not set yet.
    #[error("{0} is required")]
    MissingSignData(&'static str),

    /// The signer capability failed.
    #[error("signer failed: {0}")]
    Signer(#[source] BoxError),

    /// A hex-encoded field could not be parsed.
    #[error("Invalid {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    /// Malformed canonical binary input.
    #[error("Invalid event binary: {0}")]
    Decode(String),

    /// Malformed JSON input.
    #[error("Failed to create event from JSON: {0}")]
    Json(String),
}

/// Errors raised by chain-level operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Event(#[from] EventError),

    /// An event's `previous` does not match the chain tip.
    #[error("Event doesn't fit onto the chain: expected previous {expected}, got {got}")]
    ChainLinkage {
        expected: KeccakHash,
        got: KeccakHash,
    },

    /// The last event must be signed before the operation can proceed.
    #[error("Unable to {action}: last event on chain is not signed")]
    UnsignedTail { action: &'static str },

    /// Two chains disagree on the event at one position.
    #[error(transparent)]
    MergeConflict(Box<MergeConflict>),

    /// Malformed or checksum-failing chain identifier.
    #[error("Invalid event chain id: {0}")]
    InvalidIdentifier(String),

    /// Merging chains with different identifiers.
    #[error("Chain id doesn't match: expected {expected}, got {got}")]
    IdMismatch { expected: String, got: String },

    /// A partial chain's attachment point is missing from this chain.
    #[error("Events don't fit onto this chain: Event {0} not found")]
    EventNotFound(KeccakHash),

    /// A slice was requested at an event this chain doesn't hold.
    #[error("Event {0} is not part of this event chain")]
    NotInChain(KeccakHash),

    /// `state_at` was asked for more events than the chain holds.
    #[error("Unable to get state: out of bounds ({requested} > {len})")]
    OutOfBounds { requested: usize, len: usize },

    /// An event without signer cannot be anchored.
    #[error("Event {index} is not signed")]
    EventNotSigned { index: usize },

    /// The binary event count field is a u16.
    #[error("Event chain too large: {0} events exceed uint16")]
    TooManyEvents(usize),

    /// `validate_attached` was called without a verifier.
    #[error("No verification function attached to event chain")]
    NoVerifier,

    /// Malformed binary input.
    #[error("Invalid event chain binary: {0}")]
    Decode(String),

    /// Malformed JSON input.
    #[error("Failed to create event chain from JSON: {0}")]
    Json(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl From<MergeConflict> for ChainError {
    fn from(conflict: MergeConflict) -> Self {
        ChainError::MergeConflict(Box::new(conflict))
    }
}

/// Reasons a chain fails `validate`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("No events on event chain")]
    NoEvents,

    #[error("Event {index} is not signed")]
    NotSigned { index: usize },

    #[error("Event {index} is incomplete: {reason}")]
    Incomplete { index: usize, reason: String },

    #[error("Invalid hash of event {0}")]
    InvalidHash(KeccakHash),

    #[error("Invalid signature of event {0}")]
    InvalidSignature(KeccakHash),

    #[error("Event {hash} doesn't fit onto the chain: expected previous {expected}")]
    Linkage {
        hash: KeccakHash,
        expected: KeccakHash,
    },

    #[error("Genesis event is not signed by chain creator")]
    GenesisSigner,
}

impl ChainError {
    /// The merge conflict, if this error is one.
    pub fn as_merge_conflict(&self) -> Option<&MergeConflict> {
        match self {
            ChainError::MergeConflict(conflict) => Some(conflict),
            _ => None,
        }
    }
}
