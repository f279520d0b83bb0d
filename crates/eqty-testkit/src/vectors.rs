//! Golden test vectors for deterministic verification.
//!
//! These vectors pin chain identifiers, seed hashes and one signed event, so
//! any change to id derivation or the canonical event layout shows up as a
//! mismatch.

use eqty_core::{validate_id, Event, EventChain, KeccakHash, EVENT_CHAIN_VERSION};
use eqty_ecdsa::typed_data_digest;

/// Address of private key `0x4c0883a6...3f362318`.
pub const REFERENCE_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";
/// The private key behind [`REFERENCE_ADDRESS`].
pub const REFERENCE_KEY: &str =
    "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// A golden chain identifier vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Creator address.
    pub address: &'static str,
    pub network_id: u32,
    /// Seed of the chain nonce.
    pub nonce: &'static str,
    pub expected_id: &'static str,
    pub expected_initial_hash: &'static str,
    pub expected_initial_state: &'static str,
    /// Id derived from the chain with the nonce seed `"derived"`.
    pub expected_derived_id: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "Base Sepolia chain",
            address: REFERENCE_ADDRESS,
            network_id: 84532,
            nonce: "n1",
            expected_id: "0x4200014a34ac23312a3d6e7bf8f196833bc9a9253f9681def32f93d0dfb1562c03c825a33eec4438e468c17fff815b6b47",
            expected_initial_hash: "0x8835494e4114d7a221d340a3761b2c9fed132249305331939960cbf608b2c6a2",
            expected_initial_state: "0xf83437ba643c5dcfaa7578bd9d9653f240df058f8a4133ba25790603207b3c95",
            expected_derived_id: "0x5200014a343d3cf28f1f8e2bca2ef23c4c93bd56129828ca848835494e4114d7a221d340a3761b2c9fed1322492d79e1e5",
        },
        GoldenVector {
            name: "Local network chain",
            address: REFERENCE_ADDRESS,
            network_id: 1337,
            nonce: "n1",
            expected_id: "0x4200000539ac23312a3d6e7bf8f196833bc9a9253f9681def32f93d0dfb1562c03c825a33eec4438e468c17fff1f14b310",
            expected_initial_hash: "0xfe9dbd03dcc885bd267f790c3ebe1cfe63e7b7eb5d679743a475306a4c1f70d4",
            expected_initial_state: "0xe183a775a46aa8140fbcfd17ecfcf6a7069353ab16c420215b7f646dfcf469ed",
            expected_derived_id: "0x52000005393d3cf28f1f8e2bca2ef23c4c93bd56129828ca84fe9dbd03dcc885bd267f790c3ebe1cfe63e7b7ebf186d65d",
        },
        GoldenVector {
            name: "Base mainnet chain",
            address: REFERENCE_ADDRESS,
            network_id: 8453,
            nonce: "genesis",
            expected_id: "0x420000210511f1efd0825aa3c737ce7a3831438f918cc835452f93d0dfb1562c03c825a33eec4438e468c17fff722023a1",
            expected_initial_hash: "0xdb9119d8521f99204dddb567396f55fdeb74bdb5da55b9db5991bfe555c80841",
            expected_initial_state: "0x592da2f0a92dcb44d3bcc2babd1fb892c1b49600646e68758e40b987ab3b6b74",
            expected_derived_id: "0x52000021053d3cf28f1f8e2bca2ef23c4c93bd56129828ca84db9119d8521f99204dddb567396f55fdeb74bdb5c871fbe9",
        },
    ]
}

/// Build the chain a vector describes.
pub fn chain_from_vector(vector: &GoldenVector) -> EventChain {
    EventChain::create(
        vector.address,
        vector.network_id,
        Some(vector.nonce.as_bytes()),
    )
    .expect("vector address is valid")
}

/// Verify all golden vectors.
///
/// Returns `(name, matches, actual id)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let chain = chain_from_vector(v);
            let derived = chain
                .create_derived_id(Some(b"derived".as_slice()))
                .unwrap_or_default();

            let matches = chain.id() == v.expected_id
                && chain.initial_hash().to_string() == v.expected_initial_hash
                && chain.initial_state().to_string() == v.expected_initial_state
                && derived == v.expected_derived_id
                && validate_id(
                    EVENT_CHAIN_VERSION,
                    v.network_id,
                    chain.id(),
                    eqty_core::crypto::address_bytes(v.address).as_ref().map(|a| &a[..]),
                );

            (v.name.to_string(), matches, chain.id().to_string())
        })
        .collect()
}

/// A golden signed-event vector on the first chain of [`all_vectors`].
#[derive(Debug, Clone)]
pub struct GoldenEvent {
    pub media_type: &'static str,
    pub data: &'static [u8],
    pub timestamp: u64,
    pub expected_length: usize,
    pub expected_hash: &'static str,
    /// EIP-712 digest the signer signs.
    pub expected_digest: &'static str,
    /// Chain state after the event.
    pub expected_state: &'static str,
}

pub fn golden_event() -> GoldenEvent {
    GoldenEvent {
        media_type: "text/plain",
        data: b"hello",
        timestamp: 1_700_000_000_000,
        expected_length: 99,
        expected_hash: "0x017480c3799924a69dca3aed5e8dbae67f2b51e0202d384e7c2d3a7d77263871",
        expected_digest: "0x8a2596aef08f680b4a9a536d8cba7f8089911c7d4763503b97c743f4985c381c",
        expected_state: "0x14db8787f622bb600693a57b6bd5fc3c892b7e9c8b28dda2d79fc05685db1215",
    }
}

/// The unsigned event a [`GoldenEvent`] describes, linked onto `chain`.
pub fn event_from_vector(vector: &GoldenEvent, chain: &EventChain) -> Event {
    let mut event = Event::with_media_type(vector.data, vector.media_type)
        .expect("vector payload is text")
        .with_previous(chain.initial_hash());
    event.set_signer_address(REFERENCE_ADDRESS);
    event.set_timestamp(vector.timestamp);
    event.set_network_id(chain.network_id());
    event
}

/// The EIP-712 digest of a vector event as 0x hex.
pub fn digest_of(event: &Event) -> String {
    let data = event.sign_data().expect("vector event is complete");
    let digest = typed_data_digest(&data).expect("event typed data is supported");
    KeccakHash::from_bytes(digest).to_string()
}
