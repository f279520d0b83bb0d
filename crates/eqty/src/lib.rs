//! # EQTY
//!
//! The unified API for EQTY event chains: tamper-evident logs of signed
//! application events that can be sliced, merged and anchored to a ledger.
//!
//! ## Overview
//!
//! - **Events**: a payload linked to its predecessor by hash and signed as
//!   EIP-712 typed data
//! - **Event chains**: ordered events under a self-certifying id, with a
//!   running state hash
//! - **Partial chains**: suffixes that attach to a known event and merge back
//! - **Anchoring**: `(state, event hash)` pairs submitted to a ledger contract
//!
//! ## Usage
//!
//! ```rust,no_run
//! use eqty::{EventChain, Event, Eip712Verifier, PrivateKeySigner};
//!
//! async fn example() -> eqty::Result<()> {
//!     let signer = PrivateKeySigner::from_hex(
//!         "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
//!     )?;
//!
//!     let mut chain = EventChain::create(signer.address(), 84532, None)?;
//!     chain
//!         .add_event(Event::new(serde_json::json!({"hello": "world"})))?
//!         .sign_with(&signer)
//!         .await?;
//!
//!     chain.validate(&Eip712Verifier).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `eqty::core` - Events, chains, identifiers and codecs
//! - `eqty::ecdsa` - secp256k1 signing and verification

pub mod anchor;
pub mod error;

// Re-export component crates
pub use eqty_core as core;
pub use eqty_ecdsa as ecdsa;

pub use anchor::{contract_address, Anchor, AnchorClient, AnchorConfig, AnchorContract, MemoryAnchorContract};
pub use error::{EqtyError, Result};

// Re-export commonly used types
pub use eqty_core::{
    AnchorPair, Attachment, ChainError, Event, EventChain, EventError, KeccakHash, MergeConflict,
    PartialHeader, Payload, Signer, ValidationError, Verifier,
};
pub use eqty_ecdsa::{Eip712Verifier, PrivateKeySigner};
