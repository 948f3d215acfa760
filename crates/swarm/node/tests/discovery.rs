//! Discovery feeding the dial manager through a live event loop.

use std::time::Duration;

use keel_swarm_node::{ConnectError, EndpointConfig, SwarmNode, SwarmNodeEvent};
use libp2p::{Multiaddr, PeerId, identity::Keypair, multiaddr::Protocol};
use tokio::{sync::broadcast, time::timeout};

const BOUND: Duration = Duration::from_secs(15);

fn local_config() -> EndpointConfig {
    EndpointConfig::default()
        .with_listen_addrs(vec!["/ip4/127.0.0.1/tcp/0".parse().unwrap()])
        .with_mdns(false)
        .with_dial_timeout(Duration::from_secs(5))
}

async fn started(config: EndpointConfig) -> (SwarmNode, Multiaddr) {
    let mut node = SwarmNode::new(Keypair::generate_ed25519(), config);
    let addrs = node.start(None).await.unwrap();
    let addr = addrs.into_iter().next().unwrap();
    (node, addr)
}

async fn wait_for(
    events: &mut broadcast::Receiver<SwarmNodeEvent>,
    mut matches: impl FnMut(&SwarmNodeEvent) -> bool,
) -> SwarmNodeEvent {
    timeout(BOUND, async {
        loop {
            match events.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event channel closed"),
            }
        }
    })
    .await
    .expect("event must arrive within bound")
}

fn connected_to(peer: PeerId) -> impl FnMut(&SwarmNodeEvent) -> bool {
    move |event| matches!(event, SwarmNodeEvent::PeerConnected(record) if record.id == peer)
}

fn disconnected_from(peer: PeerId) -> impl FnMut(&SwarmNodeEvent) -> bool {
    move |event| matches!(event, SwarmNodeEvent::PeerDisconnected(p) if *p == peer)
}

#[tokio::test(flavor = "multi_thread")]
async fn bootstrap_peer_is_dialed_once_listening() {
    let (mut b, b_addr) = started(local_config()).await;
    let b_id = b.local_peer_id();
    let bootstrap = b_addr.with(Protocol::P2p(b_id));

    let mut a = SwarmNode::new(
        Keypair::generate_ed25519(),
        local_config().with_bootstrap(vec![bootstrap.clone()]),
    );
    let mut events = a.subscribe();
    a.start(None).await.unwrap();

    wait_for(&mut events, |event| {
        matches!(event, SwarmNodeEvent::PeerDiscovered(record) if record.id == b_id)
    })
    .await;
    wait_for(&mut events, connected_to(b_id)).await;

    let handle = a.handle().unwrap();
    assert!(handle.connected_peers().iter().any(|r| r.id == b_id));

    assert_eq!(handle.disconnect(bootstrap).await.unwrap(), b_id);
    wait_for(&mut events, disconnected_from(b_id)).await;

    a.stop().await;
    b.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn discovery_after_start_dials_immediately() {
    let (mut a, _) = started(local_config()).await;
    let (mut b, b_addr) = started(local_config()).await;
    let b_id = b.local_peer_id();
    let mut events = a.subscribe();

    let handle = a.handle().unwrap();
    handle.discovered(b_id, vec![b_addr.clone()]).unwrap();
    wait_for(&mut events, connected_to(b_id)).await;

    // no /p2p/ component, resolved through the address book
    assert_eq!(handle.disconnect(b_addr.clone()).await.unwrap(), b_id);
    wait_for(&mut events, disconnected_from(b_id)).await;

    assert!(matches!(
        handle.disconnect(b_addr.clone()).await,
        Err(ConnectError::NotConnected(addr)) if addr == b_addr
    ));

    a.stop().await;
    b.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn disconnecting_an_unknown_address_fails() {
    let (mut a, _) = started(local_config()).await;
    let unknown: Multiaddr = "/ip4/127.0.0.1/tcp/1".parse().unwrap();

    let result = a.handle().unwrap().disconnect(unknown.clone()).await;
    assert!(matches!(result, Err(ConnectError::NotConnected(addr)) if addr == unknown));

    a.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn relay_client_node_starts_and_connects() {
    let (mut a, _) = started(local_config().with_relay(true)).await;
    let (mut b, b_addr) = started(local_config()).await;

    let peer = a.handle().unwrap().connect(b_addr).await.unwrap();
    assert_eq!(peer, b.local_peer_id());

    a.stop().await;
    b.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn identify_reports_are_discoveries() {
    let (mut a, _) = started(local_config()).await;
    let (mut b, b_addr) = started(local_config()).await;
    let a_id = a.local_peer_id();
    let mut b_events = b.subscribe();

    a.handle().unwrap().connect(b_addr).await.unwrap();

    let event = wait_for(&mut b_events, |event| {
        matches!(event, SwarmNodeEvent::PeerDiscovered(record) if record.id == a_id)
    })
    .await;
    let SwarmNodeEvent::PeerDiscovered(record) = event else {
        unreachable!()
    };
    assert!(!record.addresses.is_empty());

    a.stop().await;
    b.stop().await;
}
