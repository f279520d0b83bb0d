//! Self-certifying chain identifiers.
//!
//! Every identifier decodes to exactly [`ID_LENGTH`] bytes:
//!
//! ```text
//! raw      = prefix(1) | network_id(u32 BE) | nonce(20) | keccak256(group)[0..20]
//! checksum = keccak256(raw)[0..4]
//! id       = "0x" + hex(raw | checksum)
//! ```
//!
//! Chain ids use [`EVENT_CHAIN_VERSION`] as prefix and the creator's address
//! bytes as group. Derived ids use [`DERIVED_ID_PREFIX`] and the parent
//! chain's id bytes as group.

use rand::RngCore;

use crate::crypto::{decode_hex, encode_hex_prefixed, keccak256};
use crate::error::ChainError;

/// Chain format version, also the prefix of chain ids.
pub const EVENT_CHAIN_VERSION: u8 = 0x42;

/// Prefix of ids derived from a chain id.
pub const DERIVED_ID_PREFIX: u8 = 0x52;

/// Length of a nonce in bytes.
pub const NONCE_LENGTH: usize = 20;

/// Length of a decoded identifier in bytes.
pub const ID_LENGTH: usize = 1 + 4 + NONCE_LENGTH + 20 + 4;

const NETWORK_RANGE: std::ops::Range<usize> = 1..5;
const NONCE_RANGE: std::ops::Range<usize> = 5..25;
const GROUP_RANGE: std::ops::Range<usize> = 25..45;
const CHECKSUM_START: usize = 45;

/// Build an identifier from its parts.
pub fn build_id(
    prefix: u8,
    network_id: u32,
    group: &[u8],
    nonce: &[u8],
) -> Result<[u8; ID_LENGTH], ChainError> {
    if nonce.len() != NONCE_LENGTH {
        return Err(ChainError::InvalidIdentifier(
            "Random bytes should have a length of 20".into(),
        ));
    }

    let mut id = [0u8; ID_LENGTH];
    id[0] = prefix;
    id[NETWORK_RANGE].copy_from_slice(&network_id.to_be_bytes());
    id[NONCE_RANGE].copy_from_slice(nonce);
    id[GROUP_RANGE].copy_from_slice(&keccak256(group)[..20]);

    let checksum = keccak256(&id[..CHECKSUM_START]);
    id[CHECKSUM_START..].copy_from_slice(&checksum[..4]);
    Ok(id)
}

/// Derive a deterministic nonce from a seed.
pub fn create_nonce(seed: impl AsRef<[u8]>) -> [u8; NONCE_LENGTH] {
    let mut nonce = [0u8; NONCE_LENGTH];
    nonce.copy_from_slice(&keccak256(seed.as_ref())[..NONCE_LENGTH]);
    nonce
}

/// Draw a random nonce from `rng`.
pub fn random_nonce<R: RngCore + ?Sized>(rng: &mut R) -> [u8; NONCE_LENGTH] {
    let mut nonce = [0u8; NONCE_LENGTH];
    rng.fill_bytes(&mut nonce);
    nonce
}

/// Render decoded id bytes as `0x`-prefixed hex.
pub fn id_to_string(id: &[u8; ID_LENGTH]) -> String {
    encode_hex_prefixed(id)
}

/// Decode an identifier and verify its length and checksum.
pub fn decode_id(id: &str) -> Result<[u8; ID_LENGTH], ChainError> {
    let bytes = decode_hex(id).map_err(|e| ChainError::InvalidIdentifier(format!("{id}: {e}")))?;
    let bytes: [u8; ID_LENGTH] = bytes.try_into().map_err(|b: Vec<u8>| {
        ChainError::InvalidIdentifier(format!(
            "{id}: expected {ID_LENGTH} bytes, got {}",
            b.len()
        ))
    })?;

    let checksum = keccak256(&bytes[..CHECKSUM_START]);
    if bytes[CHECKSUM_START..] != checksum[..4] {
        return Err(ChainError::InvalidIdentifier(format!("{id}: checksum mismatch")));
    }
    Ok(bytes)
}

/// Network id embedded in decoded id bytes.
pub fn network_of(id: &[u8; ID_LENGTH]) -> u32 {
    u32::from_be_bytes([id[1], id[2], id[3], id[4]])
}

/// Check that `id` is a well-formed identifier with the given prefix and
/// network, optionally created for `group`.
pub fn validate_id(prefix: u8, network_id: u32, id: &str, group: Option<&[u8]>) -> bool {
    let Ok(bytes) = decode_id(id) else {
        return false;
    };
    if bytes[0] != prefix || network_of(&bytes) != network_id {
        return false;
    }
    match group {
        Some(group) => bytes[GROUP_RANGE] == keccak256(group)[..20],
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const ADDRESS: [u8; 20] = [0x11; 20];

    #[test]
    fn test_id_length_is_fixed() {
        assert_eq!(ID_LENGTH, 49);
        let id = build_id(EVENT_CHAIN_VERSION, 1, &ADDRESS, &[0; 20]).unwrap();
        assert_eq!(id_to_string(&id).len(), 2 + 2 * ID_LENGTH);
    }

    #[test]
    fn test_build_id_layout() {
        let nonce = create_nonce("n1");
        let id = build_id(EVENT_CHAIN_VERSION, 1337, &ADDRESS, &nonce).unwrap();

        assert_eq!(id[0], 0x42);
        assert_eq!(network_of(&id), 1337);
        assert_eq!(&id[NONCE_RANGE], &nonce);
        assert_eq!(&id[GROUP_RANGE], &keccak256(&ADDRESS)[..20]);
        assert_eq!(&id[CHECKSUM_START..], &keccak256(&id[..CHECKSUM_START])[..4]);
    }

    #[test]
    fn test_build_id_rejects_short_nonce() {
        let err = build_id(EVENT_CHAIN_VERSION, 1, &ADDRESS, &[0; 19]).unwrap_err();
        assert!(err.to_string().contains("Random bytes should have a length of 20"));
    }

    #[test]
    fn test_create_nonce_is_deterministic() {
        assert_eq!(create_nonce("seed"), create_nonce(b"seed"));
        assert_ne!(create_nonce("seed"), create_nonce("other"));
    }

    #[test]
    fn test_random_nonce_uses_injected_rng() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        assert_eq!(random_nonce(&mut a), random_nonce(&mut b));
    }

    #[test]
    fn test_validate_id() {
        let id = id_to_string(&build_id(EVENT_CHAIN_VERSION, 5, &ADDRESS, &[3; 20]).unwrap());

        assert!(validate_id(EVENT_CHAIN_VERSION, 5, &id, None));
        assert!(validate_id(EVENT_CHAIN_VERSION, 5, &id, Some(&ADDRESS)));
        assert!(!validate_id(EVENT_CHAIN_VERSION, 6, &id, None));
        assert!(!validate_id(DERIVED_ID_PREFIX, 5, &id, None));
        assert!(!validate_id(EVENT_CHAIN_VERSION, 5, &id, Some(&[0x22; 20])));
        assert!(!validate_id(EVENT_CHAIN_VERSION, 5, "0x1234", None));
        assert!(!validate_id(EVENT_CHAIN_VERSION, 5, "not hex", None));
    }

    #[test]
    fn test_decode_id_detects_checksum_mismatch() {
        let mut id = build_id(EVENT_CHAIN_VERSION, 5, &ADDRESS, &[3; 20]).unwrap();
        id[10] ^= 0x01;
        let err = decode_id(&id_to_string(&id)).unwrap_err();
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
