//! Anchoring signed chains through the anchor client.

use eqty::anchor::{Anchor, AnchorClient, AnchorConfig, MemoryAnchorContract, ZERO_HASH};
use eqty::{EqtyError, Event};
use eqty_testkit::fixtures::TestFixture;
use eqty_testkit::init_tracing;

#[tokio::test]
async fn test_anchor_every_event() {
    init_tracing();
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("anchor", 5).await;
    let client = AnchorClient::new(MemoryAnchorContract::new(2));

    let receipts = client.anchor_chain(&chain).await.unwrap();
    assert_eq!(receipts, vec![0, 1, 2]);

    let anchors = client.contract().anchors().await;
    assert_eq!(anchors.len(), 5);
    assert_eq!(anchors[0].key, chain.initial_state().to_string());
    assert_eq!(anchors[0].value, chain.events()[0].hash().unwrap().to_string());
    assert_eq!(anchors[4].key, chain.state_at(4).unwrap().to_string());
    assert_eq!(anchors[4].value, chain.latest_hash().unwrap().to_string());

    let map = chain.anchor_map().unwrap();
    let expected: Vec<Anchor> = map.iter().map(Anchor::from).collect();
    assert_eq!(anchors, expected);
    assert!(map.iter().all(|pair| pair.signer == alice.address()));
}

#[tokio::test]
async fn test_anchor_latest_state() {
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("latest", 3).await;
    let client = AnchorClient::new(MemoryAnchorContract::default());

    client.anchor_latest(&chain).await.unwrap();
    let anchors = client.contract().anchors().await;
    assert_eq!(
        anchors,
        vec![Anchor {
            key: chain.state().unwrap().to_string(),
            value: chain.latest_hash().unwrap().to_string(),
        }]
    );
}

#[tokio::test]
async fn test_anchor_partial_chain_continues_state() {
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("partial-anchor", 4).await;
    let partial = chain
        .starting_after(&chain.events()[1].hash().unwrap())
        .unwrap();
    let client = AnchorClient::new(MemoryAnchorContract::default());

    client.anchor_chain(&partial).await.unwrap();
    let anchors = client.contract().anchors().await;
    assert_eq!(anchors.len(), 2);
    assert_eq!(anchors[0].key, chain.state_at(2).unwrap().to_string());
}

#[tokio::test]
async fn test_unsigned_chain_is_not_anchored() {
    let alice = TestFixture::alice();
    let mut chain = alice.chain_with_events("unsigned", 1).await;
    chain.add_event(Event::new("pending")).unwrap();
    let client = AnchorClient::new(MemoryAnchorContract::default());

    assert!(matches!(
        client.anchor_chain(&chain).await,
        Err(EqtyError::Chain(_))
    ));
    assert!(matches!(
        client.anchor_latest(&chain).await,
        Err(EqtyError::Chain(_))
    ));
    assert!(client.contract().batches().await.is_empty());
}

#[tokio::test]
async fn test_anchor_bare_hashes() {
    let alice = TestFixture::alice();
    let chain = alice.chain_with_events("hashes", 2).await;
    let hashes: Vec<_> = chain.events().iter().map(|e| e.hash().unwrap()).collect();

    let config = AnchorConfig {
        max_batch: 1,
        ..AnchorConfig::default()
    };
    let client = AnchorClient::with_config(MemoryAnchorContract::default(), config);
    let receipts = client.anchor_hashes(&hashes).await.unwrap();

    assert_eq!(receipts.len(), 2);
    let anchors = client.contract().anchors().await;
    assert!(anchors.iter().all(|a| a.value == ZERO_HASH));
}
