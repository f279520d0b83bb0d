//! Typed structured data handed to signers and verifiers.
//!
//! The shape follows EIP-712: a domain, a schema per struct type, and a value
//! map for the primary type. Binary fields stay binary here; backends decide
//! how to normalize them.

use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::crypto::encode_hex_prefixed;

/// Signing domain of typed data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedDataDomain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
}

/// One field of a struct type schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedDataField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedDataField {
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Struct type schemas keyed by type name.
pub type TypedDataTypes = BTreeMap<String, Vec<TypedDataField>>;

/// A single value in a typed-data message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// `uint*` values.
    Uint(u64),
    /// `bytes` / `bytesN` values.
    Bytes(Bytes),
    /// `address` values, `0x`-prefixed text.
    Address(String),
    /// `string` values.
    String(String),
}

impl TypedValue {
    /// JSON form with binary fields as `0x`-prefixed hex, the representation
    /// most wallet libraries expect.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            TypedValue::Uint(n) => serde_json::Value::from(*n),
            TypedValue::Bytes(b) => serde_json::Value::String(encode_hex_prefixed(b)),
            TypedValue::Address(s) | TypedValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            TypedValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::Address(s) | TypedValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            TypedValue::Uint(n) => Some(*n),
            _ => None,
        }
    }
}

impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Domain, schema and message of one typed-data signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub domain: TypedDataDomain,
    pub types: TypedDataTypes,
    pub primary_type: String,
    pub value: BTreeMap<String, TypedValue>,
}

impl TypedData {
    /// Fields of the primary type, in schema order.
    pub fn primary_fields(&self) -> &[TypedDataField] {
        self.types
            .get(&self.primary_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The message with every binary field rendered as hex.
    pub fn normalized_value(&self) -> serde_json::Value {
        let map = self
            .value
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}
