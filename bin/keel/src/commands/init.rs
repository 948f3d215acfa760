use std::path::PathBuf;

use clap::Args;
use color_eyre::eyre::{self, bail};
use keel_node_core::{BootIntent, DEFAULT_KEY_BITS, InitOptions};
use keel_repo::Repo;

#[derive(Debug, Args)]
pub(crate) struct InitArgs {
    /// Requested key size; new identities are Ed25519.
    #[arg(long, short = 'b', default_value_t = DEFAULT_KEY_BITS)]
    pub(crate) bits: u32,

    /// Passphrase for the private key (accepted, not stored).
    #[arg(long)]
    pub(crate) pass: Option<String>,
}

pub(crate) async fn run(path: PathBuf, args: InitArgs) -> eyre::Result<()> {
    let mut node = super::build(path);
    if node.repo().is_initialized().await? {
        bail!("repository already initialized at {}", node.repo().path().display());
    }

    let options = InitOptions {
        key_bits: args.bits,
        passphrase: args.pass,
    };
    node.boot(BootIntent::new().init(options)).await?;

    if let Some(peer_id) = node.peer_id() {
        println!("initialized repository at {}", node.repo().path().display());
        println!("peer identity: {peer_id}");
    }
    node.stop().await;
    Ok(())
}
