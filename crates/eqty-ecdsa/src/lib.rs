//! # EQTY ECDSA
//!
//! secp256k1 backend for EQTY event chains: EIP-712 typed-data hashing, an
//! in-memory private key [`PrivateKeySigner`], and an [`Eip712Verifier`]
//! that checks signatures by recovering the signer address.
//!
//! Both types plug into the `Signer` / `Verifier` traits of `eqty-core`.

pub mod address;
pub mod eip712;
pub mod error;
pub mod verify;
pub mod wallet;

pub use address::{address_from_pubkey, to_checksum_address};
pub use eip712::typed_data_digest;
pub use error::{EcdsaError, Result};
pub use verify::{recover_address, Eip712Verifier};
pub use wallet::{PrivateKeySigner, SIGNATURE_LENGTH};
