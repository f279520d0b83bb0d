//! Signature verification by public key recovery.

use async_trait::async_trait;
use eqty_core::crypto::{address_bytes, decode_hex};
use eqty_core::signer::{BoxError, Verifier};
use eqty_core::typed_data::TypedData;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::address::{address_from_pubkey, to_checksum_address};
use crate::eip712::typed_data_digest;
use crate::error::{EcdsaError, Result};
use crate::wallet::SIGNATURE_LENGTH;

/// Recover the signer address of an `r | s | v` signature over `digest`.
///
/// `v` may be 27/28 or 0/1. High-`s` signatures are rejected (EIP-2).
pub fn recover_address(digest: &[u8; 32], signature: &[u8]) -> Result<[u8; 20]> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(EcdsaError::InvalidSignature(format!(
            "expected {SIGNATURE_LENGTH} bytes, got {}",
            signature.len()
        )));
    }

    let v = match signature[64] {
        v @ (27 | 28) => v - 27,
        v @ (0 | 1) => v,
        v => return Err(EcdsaError::InvalidSignature(format!("invalid v {v}"))),
    };
    let recovery_id = RecoveryId::from_byte(v)
        .ok_or_else(|| EcdsaError::InvalidSignature(format!("invalid v {v}")))?;

    let sig = Signature::from_slice(&signature[..64])
        .map_err(|e| EcdsaError::InvalidSignature(e.to_string()))?;
    if sig.normalize_s().is_some() {
        return Err(EcdsaError::InvalidSignature("malleable signature".into()));
    }

    let key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|e| EcdsaError::InvalidSignature(e.to_string()))?;
    Ok(address_from_pubkey(&key))
}

/// Verifies EIP-712 signatures by recovering the signer address.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eip712Verifier;

impl Eip712Verifier {
    pub fn new() -> Self {
        Self
    }

    /// Checksummed address that produced `signature` over `data`.
    pub fn recover(&self, data: &TypedData, signature: &str) -> Result<String> {
        let digest = typed_data_digest(data)?;
        let bytes = decode_hex(signature).map_err(|e| EcdsaError::InvalidSignature(e.to_string()))?;
        Ok(to_checksum_address(&recover_address(&digest, &bytes)?))
    }
}

#[async_trait]
impl Verifier for Eip712Verifier {
    async fn verify(
        &self,
        address: &str,
        data: &TypedData,
        signature: &str,
    ) -> std::result::Result<bool, BoxError> {
        let Some(expected) = address_bytes(address) else {
            return Ok(false);
        };
        let digest = typed_data_digest(data)?;
        let bytes = decode_hex(signature).map_err(|e| EcdsaError::InvalidSignature(e.to_string()))?;
        let recovered = recover_address(&digest, &bytes)?;

        // Address case carries only the EIP-55 checksum.
        Ok(recovered == expected)
    }
}
