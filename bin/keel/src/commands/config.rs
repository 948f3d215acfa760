use std::path::PathBuf;

use clap::Subcommand;
use color_eyre::eyre;
use keel_repo::{FsRepo, Repo};

const REDACTED: &str = "<redacted>";

#[derive(Debug, Subcommand)]
pub(crate) enum ConfigCommand {
    /// Print the persisted config, private key redacted.
    Show,
}

pub(crate) async fn run(path: PathBuf, command: ConfigCommand) -> eyre::Result<()> {
    match command {
        ConfigCommand::Show => {
            let repo = FsRepo::new(path);
            repo.open().await?;
            let result = repo.config_get().await;
            repo.close().await?;

            let mut config = result?;
            if config.get("Identity.PrivKey").is_some() {
                config.set("Identity.PrivKey", REDACTED)?;
            }
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
