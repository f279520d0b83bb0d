//! EVM addresses derived from secp256k1 public keys.

use k256::ecdsa::VerifyingKey;
use sha3::{Digest, Keccak256};

/// Derive the 20-byte address of a public key: the last 20 bytes of the
/// Keccak-256 digest of the uncompressed key without its `0x04` tag.
pub fn address_from_pubkey(public_key: &VerifyingKey) -> [u8; 20] {
    let encoded = public_key.to_encoded_point(false);
    let hash = Keccak256::digest(&encoded.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Render an address with its EIP-55 mixed-case checksum.
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
