use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{self, WrapErr};
use keel_config::Config;
use keel_node_core::{BootIntent, InitOptions, LifecycleEvent};
use keel_observability::{MetricsArgs, install_metrics};
use keel_swarm_node::SwarmNodeEvent;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub(crate) struct DaemonArgs {
    /// Initialize the repository first if none exists.
    #[arg(long)]
    pub(crate) init: bool,

    /// TOML file deep-merged into the persisted config before starting.
    #[arg(long, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,

    /// Refuse to start without a swarm key.
    #[arg(long = "force-pnet", env = "LIBP2P_FORCE_PNET")]
    pub(crate) force_pnet: bool,

    #[command(flatten)]
    pub(crate) metrics: MetricsArgs,
}

pub(crate) async fn run(path: PathBuf, args: DaemonArgs) -> eyre::Result<()> {
    if let Some(addr) = install_metrics(&args.metrics)? {
        println!("metrics on http://{addr}/metrics");
    }

    let mut intent = BootIntent::new().start();
    if args.init {
        intent = intent.init(InitOptions::default());
    }
    if let Some(file) = &args.config {
        let content = tokio::fs::read_to_string(file)
            .await
            .wrap_err_with(|| format!("failed to read {}", file.display()))?;
        intent = intent.config(Config::parse(&content)?);
    }

    let mut node = super::fs_node(path).force_private_network(args.force_pnet).build();
    let mut lifecycle = node.subscribe();
    node.boot(intent).await?;

    if let Some(handle) = node.swarm_handle() {
        println!("peer identity: {}", handle.local_peer_id());
    }
    while let Ok(event) = lifecycle.try_recv() {
        if let LifecycleEvent::Started { listen_addrs } = event {
            for addr in listen_addrs {
                println!("listening on {addr}");
            }
        }
    }
    if let Some(mut events) = node.swarm_events() {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SwarmNodeEvent::ListenAddr(addr)) => println!("listening on {addr}"),
                    Ok(SwarmNodeEvent::PeerConnected(peer)) => {
                        info!(peer = %peer.id, "peer connected");
                    }
                    Ok(SwarmNodeEvent::PeerDisconnected(peer)) => {
                        info!(%peer, "peer disconnected");
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "event log lagging"),
                    Err(RecvError::Closed) => break,
                }
            }
        });
    }

    println!("daemon is ready");
    tokio::signal::ctrl_c().await?;
    info!("received interrupt, shutting down");
    node.stop().await;
    Ok(())
}
