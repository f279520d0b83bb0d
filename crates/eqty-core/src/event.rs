//! Event: one signed, hash-linked entry of an event chain.
//!
//! An event carries a payload with its media type, the hash of its
//! predecessor, and the identity and signature of its signer. The hash of an
//! event is the Keccak-256 digest of its canonical binary form (see
//! [`canonical`](crate::canonical)); it is either computed on demand or
//! supplied by a decoder.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::canonical::{decode_event, event_bytes};
use crate::chain::EventChain;
use crate::chain_id::EVENT_CHAIN_VERSION;
use crate::crypto::{decode_hex, encode_hex_prefixed, KeccakHash};
use crate::error::{ChainError, EventError};
use crate::payload::{
    encode_payload, Attachment, AttachmentJson, EncodedPayload, Payload, MEDIA_TYPE_JSON,
};
use crate::signer::{Signer, Verifier};
use crate::typed_data::{TypedData, TypedDataDomain, TypedDataField, TypedDataTypes, TypedValue};

/// Domain name of event typed data.
pub const EQTY_DOMAIN_NAME: &str = "EqtyEvent";

/// Primary type of event typed data.
pub const EVENT_TYPE_NAME: &str = "Event";

/// Where an event's hash comes from.
#[derive(Debug, Clone)]
enum EventHash {
    /// Set by a decoder or an explicit override. Never recomputed.
    Supplied(KeccakHash),
    /// Derived from the canonical binary on first use.
    Computed(OnceLock<KeccakHash>),
}

impl Default for EventHash {
    fn default() -> Self {
        EventHash::Computed(OnceLock::new())
    }
}

/// A single event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "EventJson", into = "EventJson")]
pub struct Event {
    version: u8,
    network_id: u32,
    media_type: String,
    data: Bytes,
    timestamp: Option<u64>,
    previous: Option<KeccakHash>,
    signer_address: Option<String>,
    signature: Option<Bytes>,
    attachments: Vec<Attachment>,
    hash: EventHash,
}

impl Event {
    /// Create an event with the payload's default media type.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self::from_encoded(EncodedPayload::from(payload.into()))
    }

    /// Create an event with an explicit media type.
    ///
    /// Fails when structured data is given any type but `application/json`.
    pub fn with_media_type(
        payload: impl Into<Payload>,
        media_type: &str,
    ) -> Result<Self, EventError> {
        Ok(Self::from_encoded(encode_payload(
            payload.into(),
            Some(media_type),
        )?))
    }

    fn from_encoded(encoded: EncodedPayload) -> Self {
        Self {
            version: EVENT_CHAIN_VERSION,
            network_id: 0,
            media_type: encoded.media_type,
            data: encoded.data,
            timestamp: None,
            previous: None,
            signer_address: None,
            signature: None,
            attachments: Vec::new(),
            hash: EventHash::default(),
        }
    }

    pub(crate) fn from_decoded(
        previous: KeccakHash,
        signer_address: String,
        timestamp: u64,
        media_type: String,
        data: Bytes,
        hash: KeccakHash,
    ) -> Self {
        let mut event = Self::from_encoded(EncodedPayload { media_type, data });
        event.previous = Some(previous);
        event.signer_address = Some(signer_address);
        event.timestamp = Some(timestamp);
        event.hash = EventHash::Supplied(hash);
        event
    }

    /// Link the event to a predecessor.
    pub fn with_previous(mut self, previous: KeccakHash) -> Self {
        self.set_previous(previous);
        self
    }

    /// Link the event to a predecessor given as hex.
    pub fn with_previous_hex(self, previous: &str) -> Result<Self, EventError> {
        let hash = KeccakHash::from_hex(previous).map_err(|e| EventError::InvalidHex {
            field: "previous",
            reason: e.to_string(),
        })?;
        Ok(self.with_previous(hash))
    }

    // Accessors

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn network_id(&self) -> u32 {
        self.network_id
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Signing time in epoch milliseconds.
    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    pub fn previous(&self) -> Option<KeccakHash> {
        self.previous
    }

    pub fn signer_address(&self) -> Option<&str> {
        self.signer_address.as_deref()
    }

    pub fn signature(&self) -> Option<&Bytes> {
        self.signature.as_ref()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Whether the hash was supplied rather than computed.
    pub fn has_supplied_hash(&self) -> bool {
        matches!(self.hash, EventHash::Supplied(_))
    }

    // Mutators. Fields feeding the canonical binary drop a computed hash.

    fn invalidate_hash(&mut self) {
        if let EventHash::Computed(_) = self.hash {
            self.hash = EventHash::default();
        }
    }

    pub fn set_payload(
        &mut self,
        payload: impl Into<Payload>,
        media_type: Option<&str>,
    ) -> Result<(), EventError> {
        let encoded = encode_payload(payload.into(), media_type)?;
        self.media_type = encoded.media_type;
        self.data = encoded.data;
        self.invalidate_hash();
        Ok(())
    }

    pub fn set_previous(&mut self, previous: KeccakHash) {
        self.previous = Some(previous);
        self.invalidate_hash();
    }

    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = Some(timestamp);
        self.invalidate_hash();
    }

    pub fn set_signer_address(&mut self, address: impl Into<String>) {
        self.signer_address = Some(address.into());
        self.invalidate_hash();
    }

    pub fn set_signature(&mut self, signature: impl Into<Bytes>) {
        self.signature = Some(signature.into());
    }

    pub fn set_network_id(&mut self, network_id: u32) {
        self.network_id = network_id;
    }

    pub fn set_version(&mut self, version: u8) {
        self.version = version;
    }

    /// Override the hash. It is no longer derived from the content.
    pub fn set_hash(&mut self, hash: KeccakHash) {
        self.hash = EventHash::Supplied(hash);
    }

    /// Attach named side data. Attachments are not hashed.
    pub fn add_attachment(
        &mut self,
        name: impl Into<String>,
        payload: impl Into<Payload>,
        media_type: Option<&str>,
    ) -> Result<&mut Self, EventError> {
        self.attachments.push(Attachment::new(name, payload, media_type)?);
        Ok(self)
    }

    // Hashing

    /// Canonical binary form.
    pub fn to_binary(&self) -> Result<Vec<u8>, EventError> {
        event_bytes(self)
    }

    /// The supplied hash, or the digest of the canonical binary.
    pub fn hash(&self) -> Result<KeccakHash, EventError> {
        match &self.hash {
            EventHash::Supplied(hash) => Ok(*hash),
            EventHash::Computed(memo) => {
                if let Some(hash) = memo.get() {
                    return Ok(*hash);
                }
                let hash = KeccakHash::hash(&self.to_binary()?);
                let _ = memo.set(hash);
                Ok(hash)
            }
        }
    }

    /// Whether the hash matches the content. False if it can't be computed.
    pub fn verify_hash(&self) -> bool {
        match self.to_binary() {
            Ok(bytes) => self
                .hash()
                .map(|hash| hash == KeccakHash::hash(&bytes))
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    // Signing

    /// Typed data covered by the signature.
    pub fn sign_data(&self) -> Result<TypedData, EventError> {
        let previous = self
            .previous
            .ok_or(EventError::MissingSignData("previous"))?;
        let signer = self
            .signer_address
            .clone()
            .ok_or(EventError::MissingSignData("signer address"))?;
        let timestamp = self
            .timestamp
            .ok_or(EventError::MissingSignData("timestamp"))?;

        let domain = TypedDataDomain {
            name: Some(EQTY_DOMAIN_NAME.to_string()),
            version: Some(self.version.to_string()),
            chain_id: Some(u64::from(self.network_id)),
        };

        let mut types = TypedDataTypes::new();
        types.insert(
            EVENT_TYPE_NAME.to_string(),
            vec![
                TypedDataField::new("version", "uint256"),
                TypedDataField::new("previous", "bytes32"),
                TypedDataField::new("signer", "address"),
                TypedDataField::new("timestamp", "uint256"),
                TypedDataField::new("mediaType", "string"),
                TypedDataField::new("dataHash", "bytes32"),
            ],
        );

        let mut value = BTreeMap::new();
        value.insert("version".into(), TypedValue::Uint(u64::from(self.version)));
        value.insert(
            "previous".into(),
            TypedValue::Bytes(Bytes::copy_from_slice(previous.as_bytes())),
        );
        value.insert("signer".into(), TypedValue::Address(signer));
        value.insert("timestamp".into(), TypedValue::Uint(timestamp));
        value.insert(
            "mediaType".into(),
            TypedValue::String(self.media_type.clone()),
        );
        value.insert(
            "dataHash".into(),
            TypedValue::Bytes(Bytes::copy_from_slice(KeccakHash::hash(&self.data).as_bytes())),
        );

        Ok(TypedData {
            domain,
            types,
            primary_type: EVENT_TYPE_NAME.to_string(),
            value,
        })
    }

    /// Sign the event.
    ///
    /// Sets the timestamp to now and the signer address to the signer's
    /// account when they are not set yet.
    pub async fn sign_with<S: Signer + ?Sized>(
        &mut self,
        signer: &S,
    ) -> Result<&mut Self, EventError> {
        if self.timestamp.is_none() {
            self.set_timestamp(now_millis());
        }
        if self.signer_address.is_none() {
            let address = signer.address().await.map_err(EventError::Signer)?;
            self.set_signer_address(address);
        }

        let data = self.sign_data()?;
        let signature = signer
            .sign_typed_data(&data)
            .await
            .map_err(EventError::Signer)?;
        let signature = decode_hex(&signature).map_err(|e| EventError::Signer(Box::new(e)))?;
        self.signature = Some(signature.into());

        tracing::debug!(
            signer = self.signer_address.as_deref().unwrap_or_default(),
            "signed event"
        );
        Ok(self)
    }

    /// Check the signature with `verifier`.
    ///
    /// Returns false, never an error, when the event is unsigned, its sign
    /// data is incomplete, or the verifier fails.
    pub async fn verify_signature<V: Verifier + ?Sized>(&self, verifier: &V) -> bool {
        let (Some(signature), Some(address)) = (&self.signature, &self.signer_address) else {
            return false;
        };
        let Ok(data) = self.sign_data() else {
            return false;
        };

        match verifier
            .verify(address, &data, &encode_hex_prefixed(signature))
            .await
        {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(error = %e, "signature verification failed");
                false
            }
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// Append the event to `chain`.
    pub fn add_to(self, chain: &mut EventChain) -> Result<&mut Event, ChainError> {
        chain.add_event(self)
    }

    /// The payload as JSON for `application/json` data that parses,
    /// otherwise as text.
    pub fn parsed_data(&self) -> serde_json::Value {
        if self.media_type == MEDIA_TYPE_JSON {
            if let Ok(value) = serde_json::from_slice(&self.data) {
                return value;
            }
        }
        serde_json::Value::String(String::from_utf8_lossy(&self.data).into_owned())
    }

    // Serialization

    pub fn from_binary(bytes: &[u8]) -> Result<Self, EventError> {
        decode_event(bytes)
    }

    pub fn to_json(&self) -> EventJson {
        EventJson {
            version: self.version,
            network_id: self.network_id,
            media_type: self.media_type.clone(),
            data: BASE64.encode(&self.data),
            timestamp: self.timestamp,
            previous: self.previous,
            signer_address: self.signer_address.clone(),
            signature: self.signature.as_ref().map(|s| encode_hex_prefixed(s)),
            hash: self.hash().ok(),
            attachments: self.attachments.iter().map(AttachmentJson::from).collect(),
        }
    }

    pub fn from_json(json: EventJson) -> Result<Self, EventError> {
        let data = BASE64
            .decode(json.data.as_bytes())
            .map_err(|e| EventError::Json(format!("data: {e}")))?;
        let signature = json
            .signature
            .as_deref()
            .map(decode_hex)
            .transpose()
            .map_err(|e| EventError::Json(format!("signature: {e}")))?;
        let attachments = json
            .attachments
            .into_iter()
            .map(Attachment::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: json.version,
            network_id: json.network_id,
            media_type: json.media_type,
            data: data.into(),
            timestamp: json.timestamp,
            previous: json.previous,
            signer_address: json.signer_address,
            signature: signature.map(Bytes::from),
            attachments,
            hash: json.hash.map(EventHash::Supplied).unwrap_or_default(),
        })
    }
}

impl From<Event> for EventJson {
    fn from(event: Event) -> Self {
        event.to_json()
    }
}

impl TryFrom<EventJson> for Event {
    type Error = EventError;

    fn try_from(json: EventJson) -> Result<Self, Self::Error> {
        Event::from_json(json)
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

/// JSON form of an event.
///
/// Data is standard base64 with padding, binary fields are `0x` hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventJson {
    pub version: u8,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub network_id: u32,
    pub media_type: String,
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<KeccakHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<KeccakHash>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentJson>,
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signer::{verify_fn, BoxError};
    use async_trait::async_trait;
    use serde_json::json;

    const SIGNER: &str = "0x1111111111111111111111111111111111111111";

    /// Signs with a fixed signature and records nothing.
    struct StaticSigner;

    #[async_trait]
    impl Signer for StaticSigner {
        async fn address(&self) -> Result<String, BoxError> {
            Ok(SIGNER.to_string())
        }

        async fn sign_typed_data(&self, _data: &TypedData) -> Result<String, BoxError> {
            Ok(format!("0x{}", "ab".repeat(65)))
        }
    }

    fn linked(payload: impl Into<Payload>) -> Event {
        let mut event = Event::new(payload).with_previous(KeccakHash::from_bytes([7; 32]));
        event.set_signer_address(SIGNER);
        event.set_timestamp(1_700_000_000_000);
        event
    }

    #[test]
    fn test_new_event_defaults() {
        let event = Event::new(json!({"a": 1}));
        assert_eq!(event.media_type(), "application/json");
        assert_eq!(&event.data()[..], br#"{"a":1}"#);
        assert_eq!(event.version(), EVENT_CHAIN_VERSION);
        assert!(!event.is_signed());
    }

    #[test]
    fn test_with_media_type_rejects_structured_data() {
        let err = Event::with_media_type(json!({"a": 1}), "text/plain").unwrap_err();
        assert_eq!(err.to_string(), "Unable to encode data as text/plain");
    }

    #[test]
    fn test_with_previous_hex() {
        let hash = KeccakHash::hash(b"prev");
        let event = Event::new("x").with_previous_hex(&hash.to_string()).unwrap();
        assert_eq!(event.previous(), Some(hash));
        assert!(Event::new("x").with_previous_hex("0xzz").is_err());
    }

    #[test]
    fn test_hash_is_memoized_and_invalidated() {
        let mut event = linked("hello");
        let first = event.hash().unwrap();
        assert_eq!(first, KeccakHash::hash(&event.to_binary().unwrap()));

        event.set_timestamp(1_700_000_000_001);
        assert_ne!(event.hash().unwrap(), first);
    }

    #[test]
    fn test_hash_override_breaks_verify_hash() {
        let mut event = linked("hello");
        assert!(event.verify_hash());

        event.set_hash(KeccakHash::from_bytes([0; 32]));
        assert!(event.has_supplied_hash());
        assert!(!event.verify_hash());
    }

    #[test]
    fn test_verify_hash_false_when_incomplete() {
        assert!(!Event::new("x").verify_hash());
    }

    #[test]
    fn test_sign_data_requires_fields() {
        let err = Event::new("x").sign_data().unwrap_err();
        assert_eq!(err.to_string(), "previous is required");

        let event = Event::new("x").with_previous(KeccakHash::ZERO);
        assert_eq!(
            event.sign_data().unwrap_err().to_string(),
            "signer address is required"
        );
    }

    #[test]
    fn test_sign_data_shape() {
        let mut event = linked("hello");
        event.set_network_id(1337);
        let data = event.sign_data().unwrap();

        assert_eq!(data.domain.name.as_deref(), Some("EqtyEvent"));
        assert_eq!(data.domain.version.as_deref(), Some("66"));
        assert_eq!(data.domain.chain_id, Some(1337));
        assert_eq!(data.primary_type, "Event");
        assert_eq!(data.primary_fields().len(), 6);
        assert_eq!(
            data.value["dataHash"].as_bytes(),
            Some(&KeccakHash::hash(b"hello").as_bytes()[..])
        );
        assert_eq!(data.value["timestamp"].as_uint(), Some(1_700_000_000_000));
    }

    #[tokio::test]
    async fn test_sign_with_fills_missing_fields() {
        let mut event = Event::new("hello").with_previous(KeccakHash::ZERO);
        event.sign_with(&StaticSigner).await.unwrap();

        assert!(event.is_signed());
        assert_eq!(event.signer_address(), Some(SIGNER));
        assert!(event.timestamp().is_some());
        assert_eq!(event.signature().map(|s| s.len()), Some(65));
    }

    #[tokio::test]
    async fn test_verify_signature_never_errors() {
        let unsigned = linked("x");
        let accept = verify_fn(|_, _, _| Ok(true));
        assert!(!unsigned.verify_signature(&accept).await);

        let mut signed = linked("x");
        signed.sign_with(&StaticSigner).await.unwrap();
        assert!(signed.verify_signature(&accept).await);

        let failing = verify_fn(|_, _, _| Err("backend down".into()));
        assert!(!signed.verify_signature(&failing).await);

        let expects_hex = verify_fn(|address, _, signature| {
            Ok(address == SIGNER && signature == format!("0x{}", "ab".repeat(65)))
        });
        assert!(signed.verify_signature(&expects_hex).await);
    }

    #[test]
    fn test_parsed_data() {
        assert_eq!(Event::new(json!({"a": 1})).parsed_data(), json!({"a": 1}));
        assert_eq!(Event::new("text").parsed_data(), json!("text"));
        let broken = Event::with_media_type("{not json", MEDIA_TYPE_JSON).unwrap();
        assert_eq!(broken.parsed_data(), json!("{not json"));
    }

    #[test]
    fn test_json_roundtrip_keeps_hash_and_attachments() {
        let mut event = linked(json!({"x": [1, 2]}));
        event.set_signature(vec![1u8, 2, 3]);
        event.set_network_id(84532);
        event.add_attachment("readme", "see data", None).unwrap();

        let text = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&text).unwrap();

        assert_eq!(back.to_json(), event.to_json());
        assert_eq!(back.hash().unwrap(), event.hash().unwrap());
        assert!(back.has_supplied_hash());
        assert_eq!(back.attachments()[0].name, "readme");
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(linked("hi")).unwrap();
        assert_eq!(json["mediaType"], "text/plain");
        assert_eq!(json["data"], "aGk=");
        assert_eq!(json["previous"], format!("0x{}", "07".repeat(32)));
        assert!(json.get("signature").is_none());
        assert!(json["hash"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn test_from_json_errors_are_wrapped() {
        let err = serde_json::from_value::<Event>(json!({
            "version": 66,
            "mediaType": "text/plain",
            "data": "not base64!",
        }))
        .unwrap_err();
        assert!(err.to_string().contains("Failed to create event from JSON"));
    }

    #[test]
    fn test_binary_roundtrip_supplies_hash() {
        let event = linked("payload");
        let decoded = Event::from_binary(&event.to_binary().unwrap()).unwrap();
        assert_eq!(decoded.to_binary().unwrap(), event.to_binary().unwrap());
        assert!(decoded.verify_hash());
    }
}
