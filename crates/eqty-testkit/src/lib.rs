//! # EQTY Testkit
//!
//! Testing utilities for EQTY event chains.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed chain ids, seed hashes and a signed event for
//!   cross-implementation verification
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Deterministic wallets and chains of signed events
//!
//! ## Golden Vectors
//!
//! ```rust
//! use eqty_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, id) in verify_all_vectors() {
//!     assert!(matches, "{name}: {id}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use eqty_testkit::generators::{chain_from_params, ChainParams};
//!
//! proptest! {
//!     #[test]
//!     fn chain_state_is_deterministic(params: ChainParams) {
//!         let c1 = chain_from_params(&params);
//!         let c2 = chain_from_params(&params);
//!         prop_assert_eq!(c1.to_binary().unwrap(), c2.to_binary().unwrap());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use eqty_testkit::fixtures::TestFixture;
//!
//! let alice = TestFixture::alice();
//! let chain = alice.chain_with_events("my-chain", 3).await;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party_fixtures, verifier, TestFixture};
pub use generators::{chain_from_params, event_from_params, ChainParams, EventParams};
pub use vectors::{all_vectors, chain_from_vector, verify_all_vectors, GoldenVector};

/// Install a test log subscriber once. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .with_test_writer()
        .try_init();
}
