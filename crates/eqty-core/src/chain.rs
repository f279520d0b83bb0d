//! EventChain: an ordered, hash-linked sequence of events under one id.
//!
//! The first event links to the chain's initial hash (or to the attachment
//! point of a partial chain); every other event links to its predecessor.
//! The chain state folds every event hash into a running digest seeded from
//! the chain id, and each intermediate state is an anchor key.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::canonical::{chain_bytes, decode_chain};
use crate::chain_id::{
    build_id, create_nonce, decode_id, id_to_string, network_of, random_nonce, validate_id,
    DERIVED_ID_PREFIX, EVENT_CHAIN_VERSION, ID_LENGTH,
};
use crate::crypto::{address_bytes, KeccakHash};
use crate::error::ChainError;
use crate::event::{Event, EventJson};
use crate::merge::MergeConflict;
use crate::signer::Verifier;
use crate::validation::validate_chain;

/// Where a partial chain attaches to the full chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialHeader {
    /// Hash of the event preceding the first event of the partial chain.
    pub hash: KeccakHash,
    /// Chain state after that event.
    pub state: KeccakHash,
}

/// One anchor for an external integrity ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnchorPair {
    /// State before the event.
    pub key: KeccakHash,
    /// Hash of the event.
    pub value: KeccakHash,
    pub signer: String,
}

/// What [`EventChain::add`] accepts.
#[derive(Debug)]
pub enum ChainInput {
    Event(Event),
    Chain(EventChain),
}

impl From<Event> for ChainInput {
    fn from(event: Event) -> Self {
        ChainInput::Event(event)
    }
}

impl From<EventChain> for ChainInput {
    fn from(chain: EventChain) -> Self {
        ChainInput::Chain(chain)
    }
}

/// A chain of events.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "ChainJson", into = "ChainJson")]
pub struct EventChain {
    id: String,
    id_bytes: [u8; ID_LENGTH],
    network_id: u32,
    version: u8,
    events: Vec<Event>,
    partial: Option<PartialHeader>,
    verifier: Option<Arc<dyn Verifier>>,
}

impl EventChain {
    /// Open a chain from an existing id.
    pub fn new(id: &str) -> Result<Self, ChainError> {
        let id_bytes = decode_id(id)?;
        if id_bytes[0] != EVENT_CHAIN_VERSION {
            return Err(ChainError::InvalidIdentifier(format!(
                "{id}: not an event chain id"
            )));
        }
        Ok(Self::from_id_bytes(id_bytes))
    }

    fn from_id_bytes(id_bytes: [u8; ID_LENGTH]) -> Self {
        Self {
            id: id_to_string(&id_bytes),
            network_id: network_of(&id_bytes),
            id_bytes,
            version: EVENT_CHAIN_VERSION,
            events: Vec::new(),
            partial: None,
            verifier: None,
        }
    }

    /// Create a new chain for `address` on `network_id`.
    ///
    /// With a nonce seed the id is deterministic; without one a random nonce
    /// is drawn from the thread-local generator.
    pub fn create(
        address: &str,
        network_id: u32,
        nonce: Option<&[u8]>,
    ) -> Result<Self, ChainError> {
        match nonce {
            Some(seed) => Self::create_with_nonce(address, network_id, &create_nonce(seed)),
            None => Self::create_with_rng(address, network_id, &mut rand::thread_rng()),
        }
    }

    /// Create a new chain with a random nonce drawn from `rng`.
    pub fn create_with_rng<R: RngCore + ?Sized>(
        address: &str,
        network_id: u32,
        rng: &mut R,
    ) -> Result<Self, ChainError> {
        Self::create_with_nonce(address, network_id, &random_nonce(rng))
    }

    fn create_with_nonce(
        address: &str,
        network_id: u32,
        nonce: &[u8],
    ) -> Result<Self, ChainError> {
        let group = address_bytes(address)
            .ok_or_else(|| ChainError::InvalidIdentifier(format!("invalid address {address}")))?;
        let id_bytes = build_id(EVENT_CHAIN_VERSION, network_id, &group, nonce)?;
        tracing::debug!(chain_id = %id_to_string(&id_bytes), network_id, "created event chain");
        Ok(Self::from_id_bytes(id_bytes))
    }

    /// Assemble a chain without linkage checks. Events are stamped with the
    /// chain's network and version.
    pub fn from_parts(
        id: &str,
        partial: Option<PartialHeader>,
        events: Vec<Event>,
    ) -> Result<Self, ChainError> {
        let mut chain = Self::new(id)?;
        chain.partial = partial;
        chain.events = events;
        for event in &mut chain.events {
            event.set_network_id(chain.network_id);
            event.set_version(chain.version);
        }
        Ok(chain)
    }

    // Accessors

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn id_bytes(&self) -> &[u8; ID_LENGTH] {
        &self.id_bytes
    }

    pub fn network_id(&self) -> u32 {
        self.network_id
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Mutable access to the events. Changing an event can break linkage;
    /// [`validate`](Self::validate) detects it.
    pub fn events_mut(&mut self) -> &mut [Event] {
        &mut self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn partial(&self) -> Option<&PartialHeader> {
        self.partial.as_ref()
    }

    pub fn is_partial(&self) -> bool {
        self.partial.is_some()
    }

    // Hashes and state

    /// Hash the first event of a complete chain links to.
    pub fn initial_hash(&self) -> KeccakHash {
        KeccakHash::hash(&self.id_bytes)
    }

    /// State of a complete chain before its first event.
    pub fn initial_state(&self) -> KeccakHash {
        let mut reversed = self.id_bytes;
        reversed.reverse();
        KeccakHash::hash(&reversed)
    }

    /// Hash the first event links to: the partial attach point or the
    /// initial hash.
    fn base_hash(&self) -> KeccakHash {
        self.partial
            .map(|p| p.hash)
            .unwrap_or_else(|| self.initial_hash())
    }

    fn base_state(&self) -> KeccakHash {
        self.partial
            .map(|p| p.state)
            .unwrap_or_else(|| self.initial_state())
    }

    /// Hash the next event must link to.
    pub fn latest_hash(&self) -> Result<KeccakHash, ChainError> {
        match self.events.last() {
            Some(event) => Ok(event.hash()?),
            None => Ok(self.base_hash()),
        }
    }

    /// State after the first `n` events.
    pub fn state_at(&self, n: usize) -> Result<KeccakHash, ChainError> {
        if n > self.events.len() {
            return Err(ChainError::OutOfBounds {
                requested: n,
                len: self.events.len(),
            });
        }
        self.events[..n]
            .iter()
            .try_fold(self.base_state(), |state, event| -> Result<_, ChainError> {
                Ok(KeccakHash::chain(&state, &event.hash()?))
            })
    }

    /// State after all events. The chain must be fully signed.
    pub fn state(&self) -> Result<KeccakHash, ChainError> {
        self.ensure_tail_signed("get state")?;
        self.state_at(self.events.len())
    }

    /// One anchor per event: the state before it and its hash.
    pub fn anchor_map(&self) -> Result<Vec<AnchorPair>, ChainError> {
        let mut state = self.base_state();
        let mut anchors = Vec::with_capacity(self.events.len());

        for (index, event) in self.events.iter().enumerate() {
            let signer = event
                .signer_address()
                .ok_or(ChainError::EventNotSigned { index })?;
            let hash = event.hash()?;
            anchors.push(AnchorPair {
                key: state,
                value: hash,
                signer: signer.to_string(),
            });
            state = KeccakHash::chain(&state, &hash);
        }

        Ok(anchors)
    }

    /// The single anchor for the chain as a whole: `(state, latest hash)`.
    pub fn latest_anchor(&self) -> Result<(KeccakHash, KeccakHash), ChainError> {
        Ok((self.state()?, self.latest_hash()?))
    }

    /// Whether an event with `hash` is on this chain.
    pub fn has(&self, hash: &KeccakHash) -> bool {
        self.position(hash).is_some()
    }

    fn position(&self, hash: &KeccakHash) -> Option<usize> {
        self.events
            .iter()
            .position(|event| event.hash().ok().as_ref() == Some(hash))
    }

    fn ensure_tail_signed(&self, action: &'static str) -> Result<(), ChainError> {
        match self.events.last() {
            Some(event) if !event.is_signed() => Err(ChainError::UnsignedTail { action }),
            _ => Ok(()),
        }
    }

    // Mutation

    /// Append an event or merge another view of this chain.
    pub fn add(&mut self, input: impl Into<ChainInput>) -> Result<(), ChainError> {
        match input.into() {
            ChainInput::Event(event) => self.add_event(event).map(|_| ()),
            ChainInput::Chain(other) => self.add_chain(&other),
        }
    }

    /// Append an event.
    ///
    /// An event without `previous` is linked to the current tip. The event
    /// is stamped with the chain's network and version.
    pub fn add_event(&mut self, mut event: Event) -> Result<&mut Event, ChainError> {
        self.ensure_tail_signed("add event")?;

        let expected = self.latest_hash()?;
        let previous = match event.previous() {
            Some(previous) => previous,
            None => {
                event.set_previous(expected);
                expected
            }
        };
        if previous != expected {
            return Err(ChainError::ChainLinkage {
                expected,
                got: previous,
            });
        }

        event.set_network_id(self.network_id);
        event.set_version(self.version);

        let index = self.events.len();
        self.events.push(event);
        Ok(&mut self.events[index])
    }

    /// Merge another view of this chain.
    ///
    /// Events both chains hold must be identical. New events are appended
    /// only after every incoming event has been checked, so a conflict
    /// leaves this chain untouched.
    pub fn add_chain(&mut self, other: &EventChain) -> Result<(), ChainError> {
        if other.id != self.id {
            return Err(ChainError::IdMismatch {
                expected: self.id.clone(),
                got: other.id.clone(),
            });
        }
        self.ensure_tail_signed("add event")?;

        let (offset, skip) = self.merge_alignment(other)?;

        let mut tip = self.latest_hash()?;
        let mut appended = Vec::new();

        for (k, incoming) in other.events.iter().enumerate().skip(skip) {
            let position = offset + k - skip;
            let incoming_hash = incoming.hash()?;

            if let Some(existing) = self.events.get(position) {
                let existing_hash = existing.hash()?;
                if existing_hash != incoming_hash {
                    tracing::warn!(
                        chain_id = %self.id,
                        position,
                        existing = %existing_hash,
                        incoming = %incoming_hash,
                        "merge conflict"
                    );
                    return Err(MergeConflict::new(
                        &self.id,
                        position,
                        existing.clone(),
                        existing_hash,
                        incoming.clone(),
                        incoming_hash,
                    )
                    .into());
                }
                continue;
            }

            if incoming.previous() != Some(tip) {
                return Err(ChainError::ChainLinkage {
                    expected: tip,
                    got: incoming.previous().unwrap_or(KeccakHash::ZERO),
                });
            }
            tip = incoming_hash;
            appended.push(incoming.clone());
        }

        tracing::debug!(
            chain_id = %self.id,
            appended = appended.len(),
            "merged event chain"
        );

        for mut event in appended {
            event.set_network_id(self.network_id);
            event.set_version(self.version);
            self.events.push(event);
        }
        Ok(())
    }

    /// Where `other`'s events line up with ours: the position of the first
    /// compared event in this chain, and how many of `other`'s events come
    /// before that point.
    fn merge_alignment(&self, other: &EventChain) -> Result<(usize, usize), ChainError> {
        if let Some(header) = &other.partial {
            if header.hash == self.base_hash() {
                return Ok((0, 0));
            }
            return self
                .position(&header.hash)
                .map(|i| (i + 1, 0))
                .ok_or(ChainError::EventNotFound(header.hash));
        }

        match &self.partial {
            None => Ok((0, 0)),
            Some(header) => {
                if header.hash == other.initial_hash() {
                    return Ok((0, 0));
                }
                other
                    .position(&header.hash)
                    .map(|j| (0, j + 1))
                    .ok_or(ChainError::EventNotFound(header.hash))
            }
        }
    }

    // Slicing

    /// The part of the chain starting with the event `hash`.
    pub fn starting_with(&self, hash: &KeccakHash) -> Result<EventChain, ChainError> {
        let index = self.position(hash).ok_or(ChainError::NotInChain(*hash))?;
        self.slice_from(index)
    }

    /// The part of the chain after the event `hash`.
    pub fn starting_after(&self, hash: &KeccakHash) -> Result<EventChain, ChainError> {
        let index = self.position(hash).ok_or(ChainError::NotInChain(*hash))?;
        self.slice_from(index + 1)
    }

    fn slice_from(&self, cut: usize) -> Result<EventChain, ChainError> {
        if cut == 0 {
            return Ok(self.clone());
        }

        let partial = PartialHeader {
            hash: self.events[cut - 1].hash()?,
            state: self.state_at(cut)?,
        };
        Ok(EventChain {
            partial: Some(partial),
            events: self.events[cut..].to_vec(),
            ..self.clone_header()
        })
    }

    fn clone_header(&self) -> EventChain {
        EventChain {
            id: self.id.clone(),
            id_bytes: self.id_bytes,
            network_id: self.network_id,
            version: self.version,
            events: Vec::new(),
            partial: self.partial,
            verifier: self.verifier.clone(),
        }
    }

    // Validation

    /// Check every event's signature, hash and linkage, and that the genesis
    /// event was signed by the chain creator.
    pub async fn validate<V: Verifier + ?Sized>(&self, verifier: &V) -> Result<(), ChainError> {
        validate_chain(self, verifier).await?;
        Ok(())
    }

    /// Attach a verifier for [`validate_attached`](Self::validate_attached).
    pub fn with_verification(mut self, verifier: Arc<dyn Verifier>) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Validate with the attached verifier.
    pub async fn validate_attached(&self) -> Result<(), ChainError> {
        let verifier = self.verifier.as_ref().ok_or(ChainError::NoVerifier)?;
        self.validate(verifier.as_ref()).await
    }

    /// Whether every event is signed.
    pub fn is_signed(&self) -> bool {
        self.events.iter().all(Event::is_signed)
    }

    /// Whether this chain's id was created by `address` on `network_id`.
    pub fn is_created_by(&self, address: &str, network_id: u32) -> bool {
        match address_bytes(address) {
            Some(group) => validate_id(EVENT_CHAIN_VERSION, network_id, &self.id, Some(&group)),
            None => false,
        }
    }

    // Derived ids

    /// Derive an id from this chain. Deterministic with a nonce seed.
    pub fn create_derived_id(&self, nonce: Option<&[u8]>) -> Result<String, ChainError> {
        match nonce {
            Some(seed) => self.derived_id(&create_nonce(seed)),
            None => self.create_derived_id_with_rng(&mut rand::thread_rng()),
        }
    }

    pub fn create_derived_id_with_rng<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<String, ChainError> {
        self.derived_id(&random_nonce(rng))
    }

    fn derived_id(&self, nonce: &[u8]) -> Result<String, ChainError> {
        let bytes = build_id(DERIVED_ID_PREFIX, self.network_id, &self.id_bytes, nonce)?;
        Ok(id_to_string(&bytes))
    }

    /// Whether `id` was derived from this chain.
    pub fn is_derived_id(&self, id: &str) -> bool {
        validate_id(DERIVED_ID_PREFIX, self.network_id, id, Some(&self.id_bytes))
    }

    // Serialization

    /// Canonical binary form. Signatures are not included.
    pub fn to_binary(&self) -> Result<Vec<u8>, ChainError> {
        chain_bytes(&self.id_bytes, self.partial.as_ref(), &self.events)
    }

    /// Decode a chain. Events come back unsigned with supplied hashes.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, ChainError> {
        let decoded = decode_chain(bytes)?;
        Self::from_parts(&id_to_string(&decoded.id_bytes), decoded.partial, decoded.events)
    }

    pub fn to_json(&self) -> ChainJson {
        let mut events = Vec::with_capacity(self.events.len() + 1);
        if let Some(header) = self.partial {
            events.push(ChainJsonEntry::Partial(header));
        }
        events.extend(self.events.iter().map(|e| ChainJsonEntry::Event(e.to_json())));
        ChainJson {
            id: self.id.clone(),
            events,
        }
    }

    pub fn from_json(json: ChainJson) -> Result<Self, ChainError> {
        let mut partial = None;
        let mut events = Vec::with_capacity(json.events.len());

        for (i, entry) in json.events.into_iter().enumerate() {
            match entry {
                ChainJsonEntry::Partial(header) if i == 0 => partial = Some(header),
                ChainJsonEntry::Partial(_) => {
                    return Err(ChainError::Json(format!(
                        "partial header at position {i}, expected first"
                    )))
                }
                ChainJsonEntry::Event(event) => events.push(Event::from_json(event)?),
            }
        }

        Self::from_parts(&json.id, partial, events)
    }
}

impl fmt::Debug for EventChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChain")
            .field("id", &self.id)
            .field("network_id", &self.network_id)
            .field("events", &self.events.len())
            .field("partial", &self.partial)
            .field("verifier", &self.verifier.is_some())
            .finish()
    }
}

/// One entry of a chain's JSON event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainJsonEntry {
    Partial(PartialHeader),
    Event(EventJson),
}

/// JSON form of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainJson {
    pub id: String,
    pub events: Vec<ChainJsonEntry>,
}

impl From<EventChain> for ChainJson {
    fn from(chain: EventChain) -> Self {
        chain.to_json()
    }
}

impl TryFrom<ChainJson> for EventChain {
    type Error = ChainError;

    fn try_from(json: ChainJson) -> Result<Self, Self::Error> {
        EventChain::from_json(json)
    }
}
