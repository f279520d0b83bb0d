//! # EQTY Core
//!
//! Pure primitives for EQTY event chains: events, chains, identifiers and
//! the typed data they are signed over.
//!
//! This crate contains no I/O and no key management. Signing and signature
//! verification are capabilities passed in through the [`Signer`] and
//! [`Verifier`] traits.
//!
//! ## Key Types
//!
//! - [`Event`] - A payload linked to its predecessor and signed as typed data
//! - [`EventChain`] - An ordered log of events under a self-certifying id
//! - [`KeccakHash`] - Event hashes, chain states and anchor keys
//! - [`MergeConflict`] - Two views of a chain disagreeing on an event
//!
//! ## Encoding
//!
//! Events hash over a fixed big-endian binary layout. See [`canonical`].

pub mod canonical;
pub mod chain;
pub mod chain_id;
pub mod crypto;
pub mod error;
pub mod event;
pub mod merge;
pub mod payload;
pub mod signer;
pub mod typed_data;
pub mod validation;

pub use chain::{AnchorPair, ChainInput, ChainJson, ChainJsonEntry, EventChain, PartialHeader};
pub use chain_id::{
    build_id, create_nonce, validate_id, DERIVED_ID_PREFIX, EVENT_CHAIN_VERSION, ID_LENGTH,
};
pub use crypto::{keccak256, KeccakHash};
pub use error::{ChainError, EventError, ValidationError};
pub use event::{Event, EventJson, EQTY_DOMAIN_NAME};
pub use merge::MergeConflict;
pub use payload::{encode_payload, Attachment, EncodedPayload, Payload};
pub use signer::{verify_fn, BoxError, Signer, Verifier, VerifyFn};
pub use typed_data::{TypedData, TypedDataDomain, TypedDataField, TypedDataTypes, TypedValue};
pub use validation::validate_chain;
