use std::path::PathBuf;

use clap::Subcommand;
use color_eyre::eyre::{self, WrapErr};
use keel_net_pnet::SwarmKey;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::info;

#[derive(Debug, Subcommand)]
pub(crate) enum SwarmKeyCommand {
    /// Generate a new private network key.
    Generate {
        /// Write the key to FILE instead of stdout. Never overwrites.
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
}

pub(crate) async fn run(command: SwarmKeyCommand) -> eyre::Result<()> {
    match command {
        SwarmKeyCommand::Generate { out } => {
            let key = SwarmKey::generate();
            match out {
                Some(path) => {
                    let mut file = OpenOptions::new()
                        .write(true)
                        .create_new(true)
                        .open(&path)
                        .await
                        .wrap_err_with(|| format!("failed to create {}", path.display()))?;
                    file.write_all(key.encode().as_bytes()).await?;
                    file.flush().await?;
                    info!(
                        path = %path.display(),
                        fingerprint = %key.fingerprint(),
                        "swarm key written"
                    );
                }
                None => println!("{}", key.encode()),
            }
            Ok(())
        }
    }
}
