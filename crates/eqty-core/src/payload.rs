//! Event payloads and attachments.
//!
//! Structured data is JSON-serialized before it is stored, so an event only
//! ever carries bytes plus a media type.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::EventError;

pub const MEDIA_TYPE_OCTET_STREAM: &str = "application/octet-stream";
pub const MEDIA_TYPE_TEXT: &str = "text/plain";
pub const MEDIA_TYPE_JSON: &str = "application/json";

/// Data that can be placed in an event or attachment.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw bytes, `application/octet-stream` unless stated otherwise.
    Bytes(Bytes),
    /// UTF-8 text, `text/plain` unless stated otherwise.
    Text(String),
    /// Structured data, always stored as `application/json`.
    Json(serde_json::Value),
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes.into())
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Payload::Json(value)
    }
}

/// A payload reduced to its stored form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPayload {
    pub media_type: String,
    pub data: Bytes,
}

impl From<Payload> for EncodedPayload {
    fn from(payload: Payload) -> Self {
        let (media_type, data) = match payload {
            Payload::Bytes(bytes) => (MEDIA_TYPE_OCTET_STREAM, bytes),
            Payload::Text(text) => (MEDIA_TYPE_TEXT, Bytes::from(text)),
            Payload::Json(value) => (MEDIA_TYPE_JSON, Bytes::from(value.to_string())),
        };
        Self {
            media_type: media_type.to_string(),
            data,
        }
    }
}

/// Resolve the media type and stored bytes of a payload.
///
/// JSON payloads may only be stored as `application/json`.
pub fn encode_payload(
    payload: Payload,
    media_type: Option<&str>,
) -> Result<EncodedPayload, EventError> {
    if let (Payload::Json(_), Some(mt)) = (&payload, media_type) {
        if mt != MEDIA_TYPE_JSON {
            return Err(EventError::Encoding(mt.to_string()));
        }
    }

    let mut encoded = EncodedPayload::from(payload);
    if let Some(mt) = media_type {
        encoded.media_type = mt.to_string();
    }
    Ok(encoded)
}

/// Named side data of an event. Not part of the hashed binary form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub media_type: String,
    pub data: Bytes,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        payload: impl Into<Payload>,
        media_type: Option<&str>,
    ) -> Result<Self, EventError> {
        let encoded = encode_payload(payload.into(), media_type)?;
        Ok(Self {
            name: name.into(),
            media_type: encoded.media_type,
            data: encoded.data,
        })
    }
}

/// JSON form of an attachment, data as standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentJson {
    pub name: String,
    pub media_type: String,
    pub data: String,
}

impl From<&Attachment> for AttachmentJson {
    fn from(att: &Attachment) -> Self {
        Self {
            name: att.name.clone(),
            media_type: att.media_type.clone(),
            data: BASE64.encode(&att.data),
        }
    }
}

impl TryFrom<AttachmentJson> for Attachment {
    type Error = EventError;

    fn try_from(json: AttachmentJson) -> Result<Self, Self::Error> {
        let data = BASE64
            .decode(json.data.as_bytes())
            .map_err(|e| EventError::Json(format!("attachment {}: {e}", json.name)))?;
        Ok(Self {
            name: json.name,
            media_type: json.media_type,
            data: data.into(),
        })
    }
}
