//! Connection gating between nodes on private and public networks.

use std::time::Duration;

use keel_net_pnet::SwarmKey;
use keel_swarm_node::{ConnectError, EndpointConfig, SwarmNode, SwarmNodeError, SwarmNodeEvent};
use libp2p::{Multiaddr, identity::Keypair};
use tokio::time::{Instant, timeout};

const BOUND: Duration = Duration::from_secs(15);

fn local_config() -> EndpointConfig {
    EndpointConfig::default()
        .with_listen_addrs(vec!["/ip4/127.0.0.1/tcp/0".parse().unwrap()])
        .with_mdns(false)
        .with_dial_timeout(Duration::from_secs(5))
        .with_ping_interval(Duration::from_millis(100))
}

async fn started(key: Option<SwarmKey>) -> (SwarmNode, Multiaddr) {
    let mut node = SwarmNode::new(Keypair::generate_ed25519(), local_config());
    let addrs = node.start(key).await.unwrap();
    let addr = addrs.into_iter().next().unwrap();
    (node, addr)
}

async fn assert_connect_fails(dialer: &SwarmNode, addr: Multiaddr) -> ConnectError {
    let handle = dialer.handle().unwrap();
    let began = Instant::now();
    let result = timeout(BOUND, handle.connect(addr))
        .await
        .expect("connect must resolve within bound");
    assert!(began.elapsed() < BOUND);
    result.expect_err("connect across networks must fail")
}

#[tokio::test(flavor = "multi_thread")]
async fn same_key_connects_and_pings() {
    let key = SwarmKey::generate();
    let (mut a, _) = started(Some(key)).await;
    let (mut b, b_addr) = started(Some(key)).await;
    let mut events = a.subscribe();

    let peer = a.handle().unwrap().connect(b_addr).await.unwrap();
    assert_eq!(peer, b.local_peer_id());

    let pings = timeout(BOUND, async {
        let mut pings = 0;
        while pings < 3 {
            if let Ok(SwarmNodeEvent::Ping { peer: p, .. }) = events.recv().await
                && p == peer
            {
                pings += 1;
            }
        }
        pings
    })
    .await
    .unwrap();
    assert_eq!(pings, 3);

    let connected = a.handle().unwrap().connected_peers();
    assert!(connected.iter().any(|r| r.id == peer));

    a.stop().await;
    b.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn different_keys_do_not_connect() {
    let (mut a, _) = started(Some(SwarmKey::generate())).await;
    let (mut b, b_addr) = started(Some(SwarmKey::generate())).await;

    assert_connect_fails(&a, b_addr).await;
    assert!(a.handle().unwrap().connected_peers().is_empty());

    a.stop().await;
    b.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn private_node_cannot_reach_public_node() {
    let (mut private, _) = started(Some(SwarmKey::generate())).await;
    let (mut public, public_addr) = started(None).await;

    assert_connect_fails(&private, public_addr).await;

    private.stop().await;
    public.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn public_node_cannot_reach_private_node() {
    let (mut private, private_addr) = started(Some(SwarmKey::generate())).await;
    let (mut public, _) = started(None).await;

    assert_connect_fails(&public, private_addr).await;

    private.stop().await;
    public.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn forced_private_network_requires_a_key() {
    let mut node = SwarmNode::new(
        Keypair::generate_ed25519(),
        local_config().with_force_private_network(true),
    );
    let err = node.start(None).await.unwrap_err();
    assert!(matches!(err, SwarmNodeError::Protector(_)));
    assert!(!node.is_running());
}

#[tokio::test(flavor = "multi_thread")]
async fn second_start_is_refused_and_stop_is_idempotent() {
    let mut node = SwarmNode::new(Keypair::generate_ed25519(), local_config());
    node.stop().await;

    node.start(None).await.unwrap();
    assert!(matches!(node.start(None).await, Err(SwarmNodeError::AlreadyRunning)));

    let handle = node.handle().unwrap();
    node.stop().await;
    node.stop().await;
    assert!(node.handle().is_none());

    let err = handle.connect("/ip4/127.0.0.1/tcp/1".parse().unwrap()).await.unwrap_err();
    assert!(matches!(err, ConnectError::NotRunning));

    node.start(None).await.unwrap();
    node.stop().await;
}
