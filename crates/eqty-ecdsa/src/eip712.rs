//! EIP-712 hashing of typed data.
//!
//! Supports flat struct types with `uint<N>`, `bytes<N>`, `bytes`, `string`
//! and `address` fields, which is what event typed data uses. Nested struct
//! types and arrays are rejected.
//!
//! ```text
//! digest = keccak256(0x19 | 0x01 | domainSeparator | hashStruct(message))
//! ```

use eqty_core::crypto::{address_bytes, keccak256};
use eqty_core::typed_data::{TypedData, TypedDataDomain, TypedDataField, TypedValue};
use std::collections::BTreeMap;

use crate::error::{EcdsaError, Result};

/// `Name(type1 name1,type2 name2,...)`
pub fn encode_type(name: &str, fields: &[TypedDataField]) -> String {
    let params = fields
        .iter()
        .map(|f| format!("{} {}", f.kind, f.name))
        .collect::<Vec<_>>()
        .join(",");
    format!("{name}({params})")
}

pub fn type_hash(name: &str, fields: &[TypedDataField]) -> [u8; 32] {
    keccak256(encode_type(name, fields).as_bytes())
}

/// Encode one atomic value as a 32-byte word.
fn encode_value(field: &TypedDataField, value: &TypedValue) -> Result<[u8; 32]> {
    let mismatch = || EcdsaError::TypeMismatch {
        field: field.name.clone(),
        kind: field.kind.clone(),
    };
    let kind = field.kind.as_str();
    let mut word = [0u8; 32];

    match kind {
        "string" => {
            let s = match value {
                TypedValue::String(s) | TypedValue::Address(s) => s,
                _ => return Err(mismatch()),
            };
            word = keccak256(s.as_bytes());
        }
        "bytes" => {
            let b = value.as_bytes().ok_or_else(mismatch)?;
            word = keccak256(b);
        }
        "address" => {
            let s = value.as_str().ok_or_else(mismatch)?;
            let addr = address_bytes(s).ok_or_else(|| EcdsaError::InvalidAddress(s.to_string()))?;
            word[12..].copy_from_slice(&addr);
        }
        _ if kind.starts_with("uint") => {
            let n = value.as_uint().ok_or_else(mismatch)?;
            word[24..].copy_from_slice(&n.to_be_bytes());
        }
        _ if kind.starts_with("bytes") => {
            let size: usize = kind[5..].parse().map_err(|_| unsupported(field))?;
            if size == 0 || size > 32 {
                return Err(unsupported(field));
            }
            let b = value.as_bytes().ok_or_else(mismatch)?;
            if b.len() != size {
                return Err(mismatch());
            }
            word[..size].copy_from_slice(b);
        }
        _ => return Err(unsupported(field)),
    }

    Ok(word)
}

fn unsupported(field: &TypedDataField) -> EcdsaError {
    EcdsaError::UnsupportedType {
        field: field.name.clone(),
        kind: field.kind.clone(),
    }
}

/// `keccak256(typeHash | encodeData(value))`
pub fn hash_struct(
    name: &str,
    fields: &[TypedDataField],
    values: &BTreeMap<String, TypedValue>,
) -> Result<[u8; 32]> {
    let mut buf = Vec::with_capacity(32 * (fields.len() + 1));
    buf.extend_from_slice(&type_hash(name, fields));
    for field in fields {
        let value = values
            .get(&field.name)
            .ok_or_else(|| EcdsaError::MissingField(field.name.clone()))?;
        buf.extend_from_slice(&encode_value(field, value)?);
    }
    Ok(keccak256(&buf))
}

/// Hash of the signing domain. Only the fields that are set take part.
pub fn domain_separator(domain: &TypedDataDomain) -> Result<[u8; 32]> {
    let mut fields = Vec::new();
    let mut values = BTreeMap::new();

    if let Some(name) = &domain.name {
        fields.push(TypedDataField::new("name", "string"));
        values.insert("name".to_string(), TypedValue::String(name.clone()));
    }
    if let Some(version) = &domain.version {
        fields.push(TypedDataField::new("version", "string"));
        values.insert("version".to_string(), TypedValue::String(version.clone()));
    }
    if let Some(chain_id) = domain.chain_id {
        fields.push(TypedDataField::new("chainId", "uint256"));
        values.insert("chainId".to_string(), TypedValue::Uint(chain_id));
    }

    hash_struct("EIP712Domain", &fields, &values)
}

/// The digest a wallet signs for `data`.
pub fn typed_data_digest(data: &TypedData) -> Result<[u8; 32]> {
    let fields = data
        .types
        .get(&data.primary_type)
        .ok_or_else(|| EcdsaError::UnknownPrimaryType(data.primary_type.clone()))?;

    let mut buf = [0u8; 66];
    buf[0] = 0x19;
    buf[1] = 0x01;
    buf[2..34].copy_from_slice(&domain_separator(&data.domain)?);
    buf[34..].copy_from_slice(&hash_struct(&data.primary_type, fields, &data.value)?);
    Ok(keccak256(&buf))
}
