//! Merge conflicts between two views of the same chain.

use std::fmt;

use crate::crypto::KeccakHash;
use crate::event::Event;

/// Two chains with the same id hold different events at one position.
///
/// Carries both events so callers can decide how to reconcile. The hashes
/// are taken when the conflict is detected.
#[derive(Debug, Clone)]
pub struct MergeConflict {
    chain_id: String,
    position: usize,
    existing: Event,
    incoming: Event,
    existing_hash: KeccakHash,
    incoming_hash: KeccakHash,
}

impl MergeConflict {
    pub(crate) fn new(
        chain_id: &str,
        position: usize,
        existing: Event,
        existing_hash: KeccakHash,
        incoming: Event,
        incoming_hash: KeccakHash,
    ) -> Self {
        Self {
            chain_id: chain_id.to_string(),
            position,
            existing,
            incoming,
            existing_hash,
            incoming_hash,
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    /// Index of the disputed event in the receiving chain.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The event the receiving chain already holds.
    pub fn existing(&self) -> &Event {
        &self.existing
    }

    /// The event the other chain holds at the same position.
    pub fn incoming(&self) -> &Event {
        &self.incoming
    }

    pub fn existing_hash(&self) -> KeccakHash {
        self.existing_hash
    }

    pub fn incoming_hash(&self) -> KeccakHash {
        self.incoming_hash
    }
}

impl fmt::Display for MergeConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Merge conflict on chain {} at position {}: event {} != {}",
            self.chain_id, self.position, self.existing_hash, self.incoming_hash
        )
    }
}

impl std::error::Error for MergeConflict {}
