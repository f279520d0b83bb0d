//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: deterministic wallets and
//! chains of signed events.

use eqty_core::{ChainError, Event, EventChain, KeccakHash, Payload};
use eqty_ecdsa::{Eip712Verifier, PrivateKeySigner};

/// Private key of the first well-known test wallet.
pub const ALICE_KEY: [u8; 32] = [0x11; 32];
/// Private key of the second well-known test wallet.
pub const BOB_KEY: [u8; 32] = [0x22; 32];
/// Private key of the third well-known test wallet.
pub const CAROL_KEY: [u8; 32] = [0xaa; 32];

pub const ALICE_ADDRESS: &str = "0x19E7E376E7C213B7E7e7e46cc70A5dD086DAff2A";
pub const BOB_ADDRESS: &str = "0x1563915e194D8CfBA1943570603F7606A3115508";
pub const CAROL_ADDRESS: &str = "0x8fd379246834eac74B8419FfdA202CF8051F7A03";

/// Base Sepolia, the default test network.
pub const TEST_NETWORK: u32 = 84532;

/// Timestamp of the first fixture event; later events add one second each.
pub const BASE_TIMESTAMP: u64 = 1_700_000_000_000;

/// A test fixture with a wallet.
pub struct TestFixture {
    pub signer: PrivateKeySigner,
    pub network_id: u32,
}

impl TestFixture {
    /// Create a new test fixture with a random key.
    pub fn new() -> Self {
        Self {
            signer: PrivateKeySigner::random(&mut rand::thread_rng()),
            network_id: TEST_NETWORK,
        }
    }

    /// Create with a fixed private key.
    pub fn with_key(key: [u8; 32]) -> Self {
        Self {
            signer: PrivateKeySigner::from_slice(&key).expect("invalid fixture key"),
            network_id: TEST_NETWORK,
        }
    }

    pub fn alice() -> Self {
        Self::with_key(ALICE_KEY)
    }

    pub fn bob() -> Self {
        Self::with_key(BOB_KEY)
    }

    pub fn carol() -> Self {
        Self::with_key(CAROL_KEY)
    }

    pub fn address(&self) -> &str {
        self.signer.address()
    }

    /// Create a chain owned by this wallet with a deterministic id.
    pub fn create_chain(&self, nonce: &str) -> EventChain {
        EventChain::create(self.address(), self.network_id, Some(nonce.as_bytes()))
            .expect("fixture address is valid")
    }

    /// Append an event to `chain` and sign it with a fixed timestamp.
    ///
    /// Returns the hash of the new event.
    pub async fn append(
        &self,
        chain: &mut EventChain,
        payload: impl Into<Payload>,
    ) -> Result<KeccakHash, ChainError> {
        let timestamp = BASE_TIMESTAMP + 1_000 * chain.len() as u64;
        let event = chain.add_event(Event::new(payload))?;
        event.set_timestamp(timestamp);
        event.sign_with(&self.signer).await?;
        Ok(event.hash()?)
    }

    /// A chain with `count` signed events carrying `{"n": i}`.
    pub async fn chain_with_events(&self, nonce: &str, count: usize) -> EventChain {
        let mut chain = self.create_chain(nonce);
        for i in 0..count {
            self.append(&mut chain, serde_json::json!({ "n": i }))
                .await
                .expect("append fixture event");
        }
        chain
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::with_key([i as u8 + 1; 32]))
        .collect()
}

/// The verifier matching the fixture wallets.
pub fn verifier() -> Eip712Verifier {
    Eip712Verifier::new()
}
