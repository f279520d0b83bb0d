//! Canonical binary encoding of events and chains.
//!
//! All integers are big-endian. An event's hash is the Keccak-256 digest of
//! its canonical bytes:
//!
//! ```text
//! previous(32) | signer_address(42 ASCII) | timestamp(4) |
//! media_type_len(u16) | media_type | data_len(u32) | data
//! ```
//!
//! Signatures and attachments are not part of the canonical form.
//!
//! A chain is encoded as:
//!
//! ```text
//! version(1) | id(49) | partial_flag(1) | [partial.hash(32) | partial.state(32)] |
//! event_count(u16) | { event_len(u32) | event }*
//! ```

use bytes::Bytes;

use crate::chain::PartialHeader;
use crate::chain_id::{EVENT_CHAIN_VERSION, ID_LENGTH};
use crate::crypto::{KeccakHash, ADDRESS_TEXT_LENGTH};
use crate::error::{ChainError, EventError};
use crate::event::Event;

/// Smallest possible event: every fixed field, empty media type and data.
pub const EVENT_MIN_LENGTH: usize = 32 + ADDRESS_TEXT_LENGTH + 4 + 2 + 4;

/// Smallest possible chain: header of a complete chain without events.
pub const CHAIN_MIN_LENGTH: usize = 1 + ID_LENGTH + 1 + 2;

/// Bounds-checked cursor over a byte slice.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Take `n` bytes, or `None` when the input is exhausted.
    pub(crate) fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if n > self.remaining() {
            return None;
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Some(slice)
    }

    pub(crate) fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    pub(crate) fn u16(&mut self) -> Option<u16> {
        let b = self.take(2)?;
        Some(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Option<u32> {
        let b = self.take(4)?;
        Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn hash(&mut self) -> Option<KeccakHash> {
        let b = self.take(32)?;
        KeccakHash::try_from(b).ok()
    }
}

/// Encode an event to its canonical bytes.
pub fn event_bytes(event: &Event) -> Result<Vec<u8>, EventError> {
    let signer = event
        .signer_address()
        .ok_or(EventError::IncompleteEvent("signer address not set"))?;
    let previous = event
        .previous()
        .ok_or(EventError::IncompleteEvent("event is not part of an event chain"))?;

    if signer.len() != ADDRESS_TEXT_LENGTH {
        return Err(EventError::IncompleteEvent(
            "signer address must be 42 characters",
        ));
    }

    let media_type = event.media_type().as_bytes();
    let data = event.data();

    let media_type_len = u16::try_from(media_type.len()).map_err(|_| EventError::TooLarge {
        field: "Media type",
        limit: "uint16",
    })?;
    let data_len = u32::try_from(data.len()).map_err(|_| EventError::TooLarge {
        field: "Data",
        limit: "uint32",
    })?;

    // Only the low 32 bits of the millisecond timestamp are kept.
    let timestamp = event.timestamp().unwrap_or(0) as u32;

    let mut buf = Vec::with_capacity(EVENT_MIN_LENGTH + media_type.len() + data.len());
    buf.extend_from_slice(previous.as_bytes());
    buf.extend_from_slice(signer.as_bytes());
    buf.extend_from_slice(&timestamp.to_be_bytes());
    buf.extend_from_slice(&media_type_len.to_be_bytes());
    buf.extend_from_slice(media_type);
    buf.extend_from_slice(&data_len.to_be_bytes());
    buf.extend_from_slice(data);
    Ok(buf)
}

/// Decode an event from canonical bytes.
///
/// The decoded event carries the hash of the whole input as a supplied hash
/// and no signature.
pub fn decode_event(bytes: &[u8]) -> Result<Event, EventError> {
    let decode_err = |msg: &str| EventError::Decode(msg.to_string());

    if bytes.len() < EVENT_MIN_LENGTH {
        return Err(decode_err("too short"));
    }

    let mut reader = Reader::new(bytes);
    let previous = reader.hash().ok_or_else(|| decode_err("too short"))?;
    let signer = reader
        .take(ADDRESS_TEXT_LENGTH)
        .ok_or_else(|| decode_err("too short"))?;
    let signer_address = std::str::from_utf8(signer)
        .map_err(|_| decode_err("signer address is not ASCII"))?
        .to_string();
    // Read as unsigned: a wrapped negative int32 from other writers decodes to
    // the same low bits, so re-encoding reproduces the hashed bytes.
    let timestamp = reader.u32().ok_or_else(|| decode_err("too short"))?;

    let media_type_len = reader.u16().ok_or_else(|| decode_err("too short"))?;
    let media_type = reader
        .take(media_type_len as usize)
        .ok_or_else(|| decode_err("mediaType out of bounds"))?;
    let media_type = std::str::from_utf8(media_type)
        .map_err(|_| decode_err("mediaType is not valid UTF-8"))?
        .to_string();

    let data_len = reader
        .u32()
        .ok_or_else(|| decode_err("data out of bounds"))?;
    let data = reader
        .take(data_len as usize)
        .ok_or_else(|| decode_err("data out of bounds"))?;

    Ok(Event::from_decoded(
        previous,
        signer_address,
        u64::from(timestamp),
        media_type,
        Bytes::copy_from_slice(data),
        KeccakHash::hash(bytes),
    ))
}

/// Encode chain parts to canonical bytes.
pub fn chain_bytes(
    id_bytes: &[u8; ID_LENGTH],
    partial: Option<&PartialHeader>,
    events: &[Event],
) -> Result<Vec<u8>, ChainError> {
    let count = u16::try_from(events.len()).map_err(|_| ChainError::TooManyEvents(events.len()))?;

    let mut buf = Vec::with_capacity(CHAIN_MIN_LENGTH + 64);
    buf.push(EVENT_CHAIN_VERSION);
    buf.extend_from_slice(id_bytes);
    match partial {
        Some(header) => {
            buf.push(1);
            buf.extend_from_slice(header.hash.as_bytes());
            buf.extend_from_slice(header.state.as_bytes());
        }
        None => buf.push(0),
    }
    buf.extend_from_slice(&count.to_be_bytes());

    for event in events {
        let bytes = event_bytes(event)?;
        let len = u32::try_from(bytes.len()).map_err(|_| EventError::TooLarge {
            field: "Event",
            limit: "uint32",
        })?;
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&bytes);
    }

    Ok(buf)
}

/// Chain parts decoded from canonical bytes.
#[derive(Debug)]
pub struct DecodedChain {
    pub id_bytes: [u8; ID_LENGTH],
    pub partial: Option<PartialHeader>,
    pub events: Vec<Event>,
}

/// Decode chain parts from canonical bytes.
pub fn decode_chain(bytes: &[u8]) -> Result<DecodedChain, ChainError> {
    let decode_err = |msg: String| ChainError::Decode(msg);

    if bytes.len() < CHAIN_MIN_LENGTH {
        return Err(decode_err("too short".into()));
    }

    let mut reader = Reader::new(bytes);
    let version = reader.u8().ok_or_else(|| decode_err("too short".into()))?;
    if version != EVENT_CHAIN_VERSION {
        return Err(decode_err(format!("version {version} not supported")));
    }

    let id_bytes: [u8; ID_LENGTH] = reader
        .take(ID_LENGTH)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| decode_err("too short".into()))?;

    let partial = match reader.u8() {
        Some(0) => None,
        Some(1) => {
            let hash = reader
                .hash()
                .ok_or_else(|| decode_err("partial header out of bounds".into()))?;
            let state = reader
                .hash()
                .ok_or_else(|| decode_err("partial header out of bounds".into()))?;
            Some(PartialHeader { hash, state })
        }
        Some(flag) => return Err(decode_err(format!("invalid partial flag {flag}"))),
        None => return Err(decode_err("too short".into())),
    };

    let count = reader
        .u16()
        .ok_or_else(|| decode_err("event count out of bounds".into()))?;

    let mut events = Vec::with_capacity(count as usize);
    for i in 0..count as usize {
        let event = reader
            .u32()
            .and_then(|len| reader.take(len as usize))
            .ok_or_else(|| decode_err(format!("event {i} out of bounds")))?;
        events.push(decode_event(event)?);
    }

    if reader.remaining() > 0 {
        return Err(decode_err(format!(
            "{} trailing bytes",
            reader.remaining()
        )));
    }

    Ok(DecodedChain {
        id_bytes,
        partial,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNER: &str = "0x1111111111111111111111111111111111111111";

    fn event(media_type: &str, data: &[u8], timestamp: u64) -> Event {
        let mut event = Event::with_media_type(data, media_type).unwrap();
        event.set_previous(KeccakHash::from_bytes([0x0a; 32]));
        event.set_signer_address(SIGNER);
        event.set_timestamp(timestamp);
        event
    }

    #[test]
    fn test_event_layout() {
        let bytes = event_bytes(&event("text/plain", b"hi", 0x0102_0304)).unwrap();

        assert_eq!(&bytes[..32], &[0x0a; 32]);
        assert_eq!(&bytes[32..74], SIGNER.as_bytes());
        assert_eq!(&bytes[74..78], &[1, 2, 3, 4]);
        assert_eq!(&bytes[78..80], &[0, 10]);
        assert_eq!(&bytes[80..90], b"text/plain");
        assert_eq!(&bytes[90..94], &[0, 0, 0, 2]);
        assert_eq!(&bytes[94..], b"hi");
    }

    #[test]
    fn test_event_timestamp_keeps_low_bits() {
        let bytes = event_bytes(&event("x", b"", 0x0001_0000_0000_0005)).unwrap();
        assert_eq!(&bytes[74..78], &[0, 0, 0, 5]);
    }

    #[test]
    fn test_event_requires_signer_and_previous() {
        let mut unsigned = Event::new("hi");
        let err = event_bytes(&unsigned).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Event cannot be converted to binary: signer address not set"
        );

        unsigned.set_signer_address(SIGNER);
        let err = event_bytes(&unsigned).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Event cannot be converted to binary: event is not part of an event chain"
        );
    }

    #[test]
    fn test_event_media_type_too_long() {
        let long = "a".repeat(0x1_0000);
        let err = event_bytes(&event(&long, b"", 1)).unwrap_err();
        assert_eq!(err.to_string(), "Media type too long: exceeds uint16");
    }

    #[test]
    fn test_decode_event_supplies_hash_of_input() {
        let bytes = event_bytes(&event("text/plain", b"hello", 42)).unwrap();
        let decoded = decode_event(&bytes).unwrap();

        assert_eq!(decoded.hash().unwrap(), KeccakHash::hash(&bytes));
        assert_eq!(decoded.media_type(), "text/plain");
        assert_eq!(&decoded.data()[..], b"hello");
        assert_eq!(decoded.timestamp(), Some(42));
        assert_eq!(decoded.signer_address(), Some(SIGNER));
        assert!(!decoded.is_signed());
    }

    #[test]
    fn test_decode_timestamp_with_sign_bit() {
        let bytes = event_bytes(&event("text/plain", b"t", 0x8000_0001)).unwrap();
        assert_eq!(&bytes[74..78], &[0x80, 0, 0, 1]);

        let decoded = decode_event(&bytes).unwrap();
        assert_eq!(decoded.timestamp(), Some(0x8000_0001));
        assert_eq!(event_bytes(&decoded).unwrap(), bytes);
        assert!(decoded.verify_hash());
    }

    #[test]
    fn test_decode_event_errors() {
        let bytes = event_bytes(&event("text/plain", b"hello", 1)).unwrap();

        let err = decode_event(&bytes[..EVENT_MIN_LENGTH - 1]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid event binary: too short");

        // Cut inside the media type.
        let mut cut = bytes[..EVENT_MIN_LENGTH - 4 + 5].to_vec();
        cut.extend_from_slice(&[0; 4]);
        let err = decode_event(&cut).unwrap_err();
        assert_eq!(err.to_string(), "Invalid event binary: mediaType out of bounds");

        let err = decode_event(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid event binary: data out of bounds");
    }

    #[test]
    fn test_chain_header_layout() {
        let id = [0x42; ID_LENGTH];
        let partial = PartialHeader {
            hash: KeccakHash::from_bytes([1; 32]),
            state: KeccakHash::from_bytes([2; 32]),
        };

        let bytes = chain_bytes(&id, Some(&partial), &[]).unwrap();
        assert_eq!(bytes.len(), CHAIN_MIN_LENGTH + 64);
        assert_eq!(bytes[0], EVENT_CHAIN_VERSION);
        assert_eq!(bytes[ID_LENGTH + 1], 1);
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 0]);

        let decoded = decode_chain(&bytes).unwrap();
        assert_eq!(decoded.id_bytes, id);
        assert_eq!(decoded.partial, Some(partial));
        assert!(decoded.events.is_empty());
    }

    #[test]
    fn test_decode_chain_errors() {
        let id = [0x42; ID_LENGTH];
        let bytes = chain_bytes(&id, None, &[event("a", b"b", 1)]).unwrap();

        let err = decode_chain(&bytes[..10]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid event chain binary: too short");

        let mut wrong_version = bytes.clone();
        wrong_version[0] = 0x41;
        let err = decode_chain(&wrong_version).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid event chain binary: version 65 not supported"
        );

        let err = decode_chain(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid event chain binary: event 0 out of bounds");

        let mut trailing = bytes.clone();
        trailing.push(0);
        let err = decode_chain(&trailing).unwrap_err();
        assert_eq!(err.to_string(), "Invalid event chain binary: 1 trailing bytes");

        let mut partial_cut = bytes[..CHAIN_MIN_LENGTH - 2].to_vec();
        partial_cut[ID_LENGTH + 1] = 1;
        partial_cut.extend_from_slice(&[0; 10]);
        let err = decode_chain(&partial_cut).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid event chain binary: partial header out of bounds"
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_decoders_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
                let _ = decode_event(&bytes);
                let _ = decode_chain(&bytes);
            }

            #[test]
            fn test_event_bytes_decode_to_same_hash(
                media_type in "[a-z/+.-]{0,32}",
                data in prop::collection::vec(any::<u8>(), 0..128),
                timestamp in any::<u32>(),
            ) {
                let original = event(&media_type, &data, u64::from(timestamp));
                let bytes = event_bytes(&original).unwrap();
                let decoded = decode_event(&bytes).unwrap();

                prop_assert_eq!(decoded.hash().unwrap(), original.hash().unwrap());
                prop_assert_eq!(event_bytes(&decoded).unwrap(), bytes);
            }
        }
    }
}
