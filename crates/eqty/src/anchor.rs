//! Anchoring chain state onto an external integrity ledger.
//!
//! The ledger itself is behind the [`AnchorContract`] trait. [`AnchorClient`]
//! turns chain anchors into `{key, value}` hex pairs and submits them in
//! batches no larger than the contract accepts.

use std::time::Duration;

use async_trait::async_trait;
use eqty_core::{AnchorPair, EventChain, KeccakHash};
use tokio::sync::Mutex;

use crate::error::{EqtyError, Result};

/// Base mainnet.
pub const BASE_CHAIN_ID: u32 = 8453;
/// Base Sepolia testnet.
pub const BASE_SEPOLIA_CHAIN_ID: u32 = 84532;

/// Not deployed yet.
pub const BASE_ANCHOR_CONTRACT: &str = "0x0000000000000000000000000000000000000000";
pub const BASE_SEPOLIA_ANCHOR_CONTRACT: &str = "0x7607af0cea78815c71bbea90110b2c218879354b";

/// Value used when only a key is anchored.
pub const ZERO_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// Address of the anchor contract on `network_id`.
pub fn contract_address(network_id: u32) -> Result<&'static str> {
    match network_id {
        BASE_CHAIN_ID => Ok(BASE_ANCHOR_CONTRACT),
        BASE_SEPOLIA_CHAIN_ID => Ok(BASE_SEPOLIA_ANCHOR_CONTRACT),
        other => Err(EqtyError::UnsupportedNetwork(other)),
    }
}

/// One `{key, value}` entry as submitted to the contract, 0x hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub key: String,
    pub value: String,
}

impl Anchor {
    pub fn new(key: &KeccakHash, value: &KeccakHash) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Anchor a key alone; the value is the zero hash.
    pub fn key_only(key: &KeccakHash) -> Self {
        Self {
            key: key.to_string(),
            value: ZERO_HASH.to_string(),
        }
    }
}

impl From<&AnchorPair> for Anchor {
    fn from(pair: &AnchorPair) -> Self {
        Self::new(&pair.key, &pair.value)
    }
}

/// The on-ledger anchor contract.
#[async_trait]
pub trait AnchorContract: Send + Sync {
    /// What a successful submission returns, e.g. a transaction hash.
    type Receipt: Send;

    /// Submit one batch of anchors.
    async fn anchor(&self, anchors: &[Anchor]) -> anyhow::Result<Self::Receipt>;

    /// Largest batch the contract accepts.
    async fn max_anchors(&self) -> anyhow::Result<usize>;
}

/// Configuration for the [`AnchorClient`].
#[derive(Debug, Clone)]
pub struct AnchorConfig {
    /// Upper bound on anchors per submission.
    pub max_batch: usize,
    /// Deadline for each contract call.
    pub timeout: Duration,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            max_batch: 50,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Submits anchors to an [`AnchorContract`].
pub struct AnchorClient<C: AnchorContract> {
    contract: C,
    config: AnchorConfig,
}

impl<C: AnchorContract> AnchorClient<C> {
    pub fn new(contract: C) -> Self {
        Self::with_config(contract, AnchorConfig::default())
    }

    pub fn with_config(contract: C, config: AnchorConfig) -> Self {
        Self { contract, config }
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn config(&self) -> &AnchorConfig {
        &self.config
    }

    /// Largest batch the contract accepts.
    pub async fn max_anchors(&self) -> Result<usize> {
        self.timed("maxAnchors", self.contract.max_anchors()).await
    }

    /// Anchor `anchors`, one contract call per batch.
    ///
    /// Returns one receipt per batch, in order. Nothing is submitted for an
    /// empty input.
    pub async fn anchor(&self, anchors: &[Anchor]) -> Result<Vec<C::Receipt>> {
        if anchors.is_empty() {
            return Ok(Vec::new());
        }

        let limit = self.config.max_batch.min(self.max_anchors().await?);
        if limit == 0 {
            return Err(EqtyError::InvalidOperation(
                "anchor batch size is zero".to_string(),
            ));
        }

        let mut receipts = Vec::with_capacity(anchors.len().div_ceil(limit));
        for (batch, chunk) in anchors.chunks(limit).enumerate() {
            tracing::debug!(batch, size = chunk.len(), "submitting anchors");
            receipts.push(self.timed("anchor", self.contract.anchor(chunk)).await?);
        }

        tracing::info!(
            anchors = anchors.len(),
            batches = receipts.len(),
            "anchored"
        );
        Ok(receipts)
    }

    /// Anchor every event of `chain`: the state before it and its hash.
    pub async fn anchor_chain(&self, chain: &EventChain) -> Result<Vec<C::Receipt>> {
        let anchors: Vec<Anchor> = chain.anchor_map()?.iter().map(Anchor::from).collect();
        tracing::debug!(chain_id = %chain.id(), events = anchors.len(), "anchoring chain");
        self.anchor(&anchors).await
    }

    /// Anchor only the chain's current state and latest hash.
    pub async fn anchor_latest(&self, chain: &EventChain) -> Result<Vec<C::Receipt>> {
        let (state, latest) = chain.latest_anchor()?;
        self.anchor(&[Anchor::new(&state, &latest)]).await
    }

    /// Anchor bare hashes with zero values.
    pub async fn anchor_hashes(&self, hashes: &[KeccakHash]) -> Result<Vec<C::Receipt>> {
        let anchors: Vec<Anchor> = hashes.iter().map(Anchor::key_only).collect();
        self.anchor(&anchors).await
    }

    async fn timed<T>(
        &self,
        call: &str,
        fut: impl std::future::Future<Output = anyhow::Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.config.timeout, fut).await {
            Ok(result) => result.map_err(|e| {
                tracing::warn!(call, error = %e, "anchor contract call failed");
                EqtyError::Contract(e)
            }),
            Err(_) => Err(EqtyError::Timeout(format!(
                "{call} did not complete within {:?}",
                self.config.timeout
            ))),
        }
    }
}

/// In-memory anchor contract.
///
/// Records every batch it receives. Useful for tests and dry runs.
pub struct MemoryAnchorContract {
    max_anchors: usize,
    batches: Mutex<Vec<Vec<Anchor>>>,
}

impl MemoryAnchorContract {
    pub fn new(max_anchors: usize) -> Self {
        Self {
            max_anchors,
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Batches received so far.
    pub async fn batches(&self) -> Vec<Vec<Anchor>> {
        self.batches.lock().await.clone()
    }

    /// All anchors received so far, flattened.
    pub async fn anchors(&self) -> Vec<Anchor> {
        self.batches.lock().await.iter().flatten().cloned().collect()
    }
}

impl Default for MemoryAnchorContract {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl AnchorContract for MemoryAnchorContract {
    /// Index of the batch.
    type Receipt = usize;

    async fn anchor(&self, anchors: &[Anchor]) -> anyhow::Result<usize> {
        if anchors.len() > self.max_anchors {
            anyhow::bail!(
                "too many anchors: {} > {}",
                anchors.len(),
                self.max_anchors
            );
        }
        let mut batches = self.batches.lock().await;
        batches.push(anchors.to_vec());
        Ok(batches.len() - 1)
    }

    async fn max_anchors(&self) -> anyhow::Result<usize> {
        Ok(self.max_anchors)
    }
}
