//! End-to-end chain scenarios with real secp256k1 signatures.

use eqty::core::chain_id::validate_id;
use eqty::core::crypto::{address_bytes, decode_hex, encode_hex_prefixed};
use eqty::{ChainError, Event, EventChain, KeccakHash, ValidationError};
use eqty_testkit::fixtures::{verifier, TestFixture, CAROL_ADDRESS};
use eqty_testkit::init_tracing;
use serde_json::json;

fn hashes(chain: &EventChain) -> Vec<KeccakHash> {
    chain.events().iter().map(|e| e.hash().unwrap()).collect()
}

#[tokio::test]
async fn test_creator_scenario() {
    init_tracing();
    let carol = TestFixture::carol();
    assert_eq!(carol.address(), CAROL_ADDRESS);

    let mut chain = EventChain::create(carol.address(), 1337, Some(b"n1".as_slice())).unwrap();
    chain
        .add_event(Event::new(json!({ "a": 1 })))
        .unwrap()
        .sign_with(&carol.signer)
        .await
        .unwrap();

    chain.validate(&verifier()).await.unwrap();
    assert!(chain.is_created_by(carol.address(), 1337));
    assert!(chain.is_created_by(&carol.address().to_lowercase(), 1337));
    assert!(!chain.is_created_by(carol.address(), 84532));
    assert!(!chain.is_created_by(TestFixture::alice().address(), 1337));

    let event = &chain.events()[0];
    assert_eq!(event.media_type(), "application/json");
    assert_eq!(event.parsed_data(), json!({ "a": 1 }));
}

#[tokio::test]
async fn test_independent_chains_conflict() {
    init_tracing();
    let alice = TestFixture::alice();
    let bob = TestFixture::bob();

    let mut ours = alice.create_chain("shared");
    let mut theirs = EventChain::new(ours.id()).unwrap();
    alice.append(&mut ours, "from alice").await.unwrap();
    bob.append(&mut theirs, "from bob").await.unwrap();

    for (target, incoming) in [(&ours, &theirs), (&theirs, &ours)] {
        let mut target = target.clone();
        let err = target.add_chain(incoming).unwrap_err();
        let conflict = err.as_merge_conflict().expect("merge conflict");

        assert_eq!(conflict.position(), 0);
        assert_eq!(conflict.chain_id(), ours.id());
        assert_eq!(conflict.existing_hash(), target.events()[0].hash().unwrap());
        assert_eq!(conflict.incoming_hash(), incoming.events()[0].hash().unwrap());
        assert_eq!(target.len(), 1);
    }
}

#[tokio::test]
async fn test_conflict_leaves_chain_untouched() {
    let alice = TestFixture::alice();
    let base = alice.chain_with_events("fork", 2).await;

    let mut left = base.clone();
    alice.append(&mut left, "left").await.unwrap();

    let mut right = base.clone();
    alice.append(&mut right, "right").await.unwrap();
    alice.append(&mut right, "right again").await.unwrap();

    let before = hashes(&left);
    let err = left.add_chain(&right).unwrap_err();
    assert_eq!(err.as_merge_conflict().map(|c| c.position()), Some(2));
    assert_eq!(hashes(&left), before);
    assert_eq!(left.state().unwrap(), left.state_at(3).unwrap());
}

#[tokio::test]
async fn test_binary_round_trip() {
    let alice = TestFixture::alice();

    for count in [0, 1, 3] {
        let chain = alice.chain_with_events(&format!("binary-{count}"), count).await;
        let decoded = EventChain::from_binary(&chain.to_binary().unwrap()).unwrap();

        assert_eq!(decoded.id(), chain.id());
        assert_eq!(hashes(&decoded), hashes(&chain), "{count} events");
        assert!(decoded.events().iter().all(|e| !e.is_signed()));
    }
}

#[tokio::test]
async fn test_partial_binary_round_trip() {
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("partial-binary", 3).await;
    let partial = chain.starting_with(&chain.events()[1].hash().unwrap()).unwrap();

    let decoded = EventChain::from_binary(&partial.to_binary().unwrap()).unwrap();
    assert_eq!(decoded.partial(), partial.partial());
    assert_eq!(hashes(&decoded), hashes(&partial));
}

#[tokio::test]
async fn test_slice_and_merge_is_noop() {
    init_tracing();
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("slice", 4).await;
    let cut = chain.events()[1].hash().unwrap();

    let partial = chain.starting_after(&cut).unwrap();
    assert!(partial.is_partial());
    assert_eq!(partial.len(), 2);
    assert_eq!(partial.state().unwrap(), chain.state().unwrap());
    partial.validate(&verifier()).await.unwrap();

    let mut full = chain.clone();
    full.add_chain(&partial).unwrap();
    assert_eq!(hashes(&full), hashes(&chain));
    assert_eq!(full.state().unwrap(), chain.state().unwrap());

    let mut head = EventChain::from_parts(chain.id(), None, chain.events()[..2].to_vec()).unwrap();
    head.add_chain(&partial).unwrap();
    assert_eq!(hashes(&head), hashes(&chain));
    head.validate(&verifier()).await.unwrap();
}

#[tokio::test]
async fn test_merge_requires_attach_point() {
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("detached", 4).await;
    let tail = chain.starting_after(&chain.events()[2].hash().unwrap()).unwrap();

    let mut head = EventChain::from_parts(chain.id(), None, chain.events()[..2].to_vec()).unwrap();
    assert!(matches!(
        head.add_chain(&tail),
        Err(ChainError::EventNotFound(_))
    ));
    assert_eq!(head.len(), 2);
}

#[tokio::test]
async fn test_id_bit_flips_are_rejected() {
    let chain = TestFixture::alice().create_chain("bits");
    let group = address_bytes(TestFixture::alice().address()).unwrap();
    let bytes = decode_hex(chain.id()).unwrap();

    assert!(validate_id(0x42, chain.network_id(), chain.id(), Some(&group)));

    for bit in 0..bytes.len() * 8 {
        let mut mutated = bytes.clone();
        mutated[bit / 8] ^= 1 << (bit % 8);
        let id = encode_hex_prefixed(&mutated);
        assert!(
            !validate_id(0x42, chain.network_id(), &id, Some(&group)),
            "bit {bit}"
        );
    }
}

#[tokio::test]
async fn test_genesis_signed_by_stranger() {
    let alice = TestFixture::alice();
    let bob = TestFixture::bob();
    let mut chain = alice.create_chain("stranger");
    bob.append(&mut chain, "not the creator").await.unwrap();

    let err = chain.validate(&verifier()).await.unwrap_err();
    assert!(matches!(
        err,
        ChainError::Validation(ValidationError::GenesisSigner)
    ));
}

#[tokio::test]
async fn test_tampered_event_fails_validation() {
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("tamper", 2).await;

    let mut json = serde_json::to_value(&chain).unwrap();
    json["events"][1]["timestamp"] = json!(1);
    json["events"][1]
        .as_object_mut()
        .unwrap()
        .remove("hash");
    let tampered: EventChain = serde_json::from_value(json).unwrap();

    let err = tampered.validate(&verifier()).await.unwrap_err();
    assert!(matches!(
        err,
        ChainError::Validation(ValidationError::InvalidSignature(_))
    ));
}

#[tokio::test]
async fn test_unsigned_tail_blocks_append() {
    let alice = TestFixture::alice();
    let mut chain = alice.chain_with_events("tail", 1).await;
    let signed = hashes(&chain);
    chain.add_event(Event::new("unsigned")).unwrap();

    assert!(matches!(
        chain.add_event(Event::new("next")),
        Err(ChainError::UnsignedTail { .. })
    ));
    assert!(matches!(chain.state(), Err(ChainError::UnsignedTail { .. })));
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.events()[0].hash().unwrap(), signed[0]);
    assert!(!chain.events()[1].is_signed());
}

#[tokio::test]
async fn test_verification_attached_to_chain() {
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("attached", 2).await;
    assert!(matches!(
        chain.validate_attached().await,
        Err(ChainError::NoVerifier)
    ));

    let chain = chain.with_verification(std::sync::Arc::new(verifier()));
    chain.validate_attached().await.unwrap();
}
