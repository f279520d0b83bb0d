//! A signer holding a secp256k1 private key in memory.

use async_trait::async_trait;
use eqty_core::crypto::{decode_hex, encode_hex_prefixed};
use eqty_core::signer::{BoxError, Signer};
use eqty_core::typed_data::TypedData;
use k256::ecdsa::{RecoveryId, SigningKey};
use rand::{CryptoRng, RngCore};
use std::fmt;

use crate::address::{address_from_pubkey, to_checksum_address};
use crate::eip712::typed_data_digest;
use crate::error::{EcdsaError, Result};

/// Length of an `r | s | v` signature.
pub const SIGNATURE_LENGTH: usize = 65;

/// Signs EIP-712 typed data with a private key.
pub struct PrivateKeySigner {
    key: SigningKey,
    address: String,
}

impl PrivateKeySigner {
    /// Load a key from 32 bytes of hex, with or without `0x`.
    pub fn from_hex(private_key: &str) -> Result<Self> {
        let bytes = decode_hex(private_key)
            .map_err(|e| EcdsaError::InvalidPrivateKey(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let key = SigningKey::from_slice(bytes)
            .map_err(|e| EcdsaError::InvalidPrivateKey(e.to_string()))?;
        Ok(Self::from_key(key))
    }

    /// Generate a fresh key.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self::from_key(SigningKey::random(rng))
    }

    fn from_key(key: SigningKey) -> Self {
        let address = to_checksum_address(&address_from_pubkey(key.verifying_key()));
        Self { key, address }
    }

    /// Checksummed address of the key.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign a 32-byte digest, returning `r | s | v` with low `s` and
    /// `v` in {27, 28}.
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Result<[u8; SIGNATURE_LENGTH]> {
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|e| EcdsaError::Signing(e.to_string()))?;

        // EIP-2: only the low-s form is accepted by verifiers.
        let (signature, recovery_id) = match signature.normalize_s() {
            Some(normalized) => (
                normalized,
                RecoveryId::new(!recovery_id.is_y_odd(), recovery_id.is_x_reduced()),
            ),
            None => (signature, recovery_id),
        };

        let mut out = [0u8; SIGNATURE_LENGTH];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte() + 27;
        Ok(out)
    }

    /// Sign typed data.
    pub fn sign_typed(&self, data: &TypedData) -> Result<[u8; SIGNATURE_LENGTH]> {
        self.sign_digest(&typed_data_digest(data)?)
    }
}

impl fmt::Debug for PrivateKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeySigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for PrivateKeySigner {
    async fn address(&self) -> std::result::Result<String, BoxError> {
        Ok(self.address.clone())
    }

    async fn sign_typed_data(&self, data: &TypedData) -> std::result::Result<String, BoxError> {
        let signature = self.sign_typed(data)?;
        tracing::debug!(address = %self.address, "signed typed data");
        Ok(encode_hex_prefixed(signature))
    }
}
