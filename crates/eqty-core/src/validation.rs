//! Chain validation: signatures, hashes, linkage and genesis signer.

use crate::chain::EventChain;
use crate::chain_id::{validate_id, EVENT_CHAIN_VERSION};
use crate::crypto::address_bytes;
use crate::error::ValidationError;
use crate::signer::Verifier;

/// Validate every event of `chain` in order.
///
/// Per event this checks, in order:
/// 1. A signature is present
/// 2. The hash matches the content
/// 3. The signature verifies
/// 4. `previous` links to the predecessor (or the chain's base hash)
///
/// When the first event links to the chain's initial hash, it must also be
/// signed by the address the chain id was created for.
pub async fn validate_chain<V: Verifier + ?Sized>(
    chain: &EventChain,
    verifier: &V,
) -> Result<(), ValidationError> {
    let events = chain.events();
    if events.is_empty() {
        return Err(ValidationError::NoEvents);
    }

    let mut expected = match chain.partial() {
        Some(header) => header.hash,
        None => chain.initial_hash(),
    };

    for (index, event) in events.iter().enumerate() {
        if !event.is_signed() {
            return Err(ValidationError::NotSigned { index });
        }

        let hash = event.hash().map_err(|e| ValidationError::Incomplete {
            index,
            reason: e.to_string(),
        })?;

        if !event.verify_hash() {
            return Err(ValidationError::InvalidHash(hash));
        }

        if !event.verify_signature(verifier).await {
            return Err(ValidationError::InvalidSignature(hash));
        }

        if event.previous() != Some(expected) {
            tracing::warn!(
                chain_id = %chain.id(),
                index,
                hash = %hash,
                "event does not link to its predecessor"
            );
            return Err(ValidationError::Linkage { hash, expected });
        }

        expected = hash;
    }

    if events[0].previous() == Some(chain.initial_hash()) {
        let creator = events[0].signer_address().and_then(address_bytes);
        let created_by_signer = creator.is_some_and(|group| {
            validate_id(EVENT_CHAIN_VERSION, chain.network_id(), chain.id(), Some(&group))
        });
        if !created_by_signer {
            return Err(ValidationError::GenesisSigner);
        }
    }

    tracing::debug!(chain_id = %chain.id(), events = events.len(), "event chain valid");
    Ok(())
}
