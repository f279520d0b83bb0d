//! Proptest generators for property-based testing.
//!
//! Events and chains built from generated parameters are signed
//! synchronously, so the same parameters always produce the same bytes.

use proptest::prelude::*;
use serde_json::Value;

use eqty_core::{Event, EventChain, KeccakHash, Payload};
use eqty_ecdsa::PrivateKeySigner;

/// Generate a valid secp256k1 private key.
///
/// The top byte is kept in `1..=0x7f`, so the key is non-zero and below the
/// curve order.
pub fn private_key() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>().prop_map(|mut key| {
        key[0] = (key[0] & 0x7f).max(1);
        key
    })
}

/// Generate a random KeccakHash.
pub fn keccak_hash() -> impl Strategy<Value = KeccakHash> {
    any::<[u8; 32]>().prop_map(KeccakHash::from_bytes)
}

/// Generate a network id.
pub fn network_id() -> impl Strategy<Value = u32> {
    prop_oneof![Just(1u32), Just(1337), Just(8453), Just(84532), any::<u32>()]
}

/// Generate a nonce seed.
pub fn nonce_seed() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,16}".prop_map(String::from)
}

/// Generate a millisecond timestamp that survives a JSON number.
pub fn timestamp() -> impl Strategy<Value = u64> {
    0u64..=(1u64 << 53)
}

/// Generate a flat JSON object.
pub fn json_value() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        "[a-z]{1,8}",
        prop_oneof![
            any::<i64>().prop_map(Value::from),
            "[ -~]{0,16}".prop_map(Value::from),
            any::<bool>().prop_map(Value::from),
        ],
        0..4,
    )
    .prop_map(|map| Value::Object(map.into_iter().collect()))
}

/// Generate a payload of any kind.
pub fn payload(max_len: usize) -> impl Strategy<Value = Payload> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(Payload::from),
        ".{0,64}".prop_map(Payload::from),
        json_value().prop_map(Payload::from),
    ]
}

/// Parameters for generating a signed event.
#[derive(Debug, Clone)]
pub struct EventParams {
    pub key: [u8; 32],
    pub payload: Payload,
    pub timestamp: u64,
    pub previous: KeccakHash,
    pub network_id: u32,
}

impl Arbitrary for EventParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            private_key(),
            payload(256),
            timestamp(),
            keccak_hash(),
            network_id(),
        )
            .prop_map(|(key, payload, timestamp, previous, network_id)| EventParams {
                key,
                payload,
                timestamp,
                previous,
                network_id,
            })
            .boxed()
    }
}

/// Generate a signed event from parameters.
pub fn event_from_params(params: &EventParams) -> Event {
    let signer = PrivateKeySigner::from_slice(&params.key).expect("generated key is valid");
    let mut event = Event::new(params.payload.clone()).with_previous(params.previous);
    event.set_network_id(params.network_id);
    sign(&mut event, &signer, params.timestamp);
    event
}

/// Parameters for generating a chain of signed events.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub key: [u8; 32],
    pub network_id: u32,
    pub nonce: String,
    pub payloads: Vec<Payload>,
}

impl Arbitrary for ChainParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            private_key(),
            network_id(),
            nonce_seed(),
            prop::collection::vec(payload(64), 0..6),
        )
            .prop_map(|(key, network_id, nonce, payloads)| ChainParams {
                key,
                network_id,
                nonce,
                payloads,
            })
            .boxed()
    }
}

/// Generate a chain from parameters. Every event is signed by the same key.
pub fn chain_from_params(params: &ChainParams) -> EventChain {
    let signer = PrivateKeySigner::from_slice(&params.key).expect("generated key is valid");
    let mut chain = EventChain::create(
        signer.address(),
        params.network_id,
        Some(params.nonce.as_bytes()),
    )
    .expect("generated address is valid");

    for (i, payload) in params.payloads.iter().enumerate() {
        let event = chain
            .add_event(Event::new(payload.clone()))
            .expect("tail is signed");
        sign(event, &signer, 1_000 * i as u64);
    }
    chain
}

fn sign(event: &mut Event, signer: &PrivateKeySigner, timestamp: u64) {
    event.set_timestamp(timestamp);
    event.set_signer_address(signer.address());
    let data = event.sign_data().expect("sign data is complete");
    let signature = signer.sign_typed(&data).expect("typed data is supported");
    event.set_signature(signature.to_vec());
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_event_hash_deterministic(params: EventParams) {
            let e1 = event_from_params(&params);
            let e2 = event_from_params(&params);
            prop_assert_eq!(e1.hash().unwrap(), e2.hash().unwrap());
            prop_assert_eq!(e1.signature(), e2.signature());
        }

        #[test]
        fn test_generated_chain_is_linked(params: ChainParams) {
            let chain = chain_from_params(&params);
            prop_assert_eq!(chain.len(), params.payloads.len());

            let mut expected = chain.initial_hash();
            for event in chain.events() {
                prop_assert_eq!(event.previous(), Some(expected));
                expected = event.hash().unwrap();
            }
        }

        #[test]
        fn test_event_hash_changes_with_payload(
            key in private_key(),
            p1 in prop::collection::vec(any::<u8>(), 0..32),
            p2 in prop::collection::vec(any::<u8>(), 0..32),
        ) {
            prop_assume!(p1 != p2);

            let params = |payload: Vec<u8>| EventParams {
                key,
                payload: Payload::from(payload),
                timestamp: 1_000,
                previous: KeccakHash::ZERO,
                network_id: 1,
            };

            prop_assert_ne!(
                event_from_params(&params(p1)).hash().unwrap(),
                event_from_params(&params(p2)).hash().unwrap()
            );
        }
    }
}
