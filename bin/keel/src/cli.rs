use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{self, OptionExt};
use keel_observability::{LogArgs, init_logging};
use tracing::debug;

use crate::commands::{self, ConfigCommand, DaemonArgs, InitArgs, SwarmKeyCommand};

/// Name of the default repository directory under the home directory.
const DEFAULT_REPO_DIR: &str = ".keel";

/// keel - private-network aware peer-to-peer node
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Repository directory [default: ~/.keel]
    #[arg(long, global = true, env = "KEEL_PATH", value_name = "DIR")]
    pub(crate) repo: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) logs: LogArgs,

    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Create a repository with a fresh identity and default config.
    Init(InitArgs),

    /// Boot the node and run until interrupted.
    Daemon(DaemonArgs),

    /// Inspect the repository config.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage private network keys.
    #[command(subcommand)]
    SwarmKey(SwarmKeyCommand),
}

impl Cli {
    fn repo_path(&self) -> eyre::Result<PathBuf> {
        if let Some(path) = &self.repo {
            return Ok(path.clone());
        }
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(DEFAULT_REPO_DIR))
            .ok_or_eyre("cannot determine home directory, pass --repo")
    }
}

pub(crate) async fn run() -> eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(&cli.logs)?;

    let repo = cli.repo_path()?;
    debug!(repo = %repo.display(), version = env!("CARGO_PKG_VERSION"), "keel");

    match cli.command {
        Commands::Init(args) => commands::init::run(repo, args).await,
        Commands::Daemon(args) => commands::daemon::run(repo, args).await,
        Commands::Config(command) => commands::config::run(repo, command).await,
        Commands::SwarmKey(command) => commands::swarm_key::run(command).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_daemon_flags() {
        let cli = Cli::try_parse_from([
            "keel", "--repo", "/tmp/keel", "-vv", "daemon", "--init", "--config", "patch.toml",
        ])
        .unwrap();

        assert_eq!(cli.repo_path().unwrap(), PathBuf::from("/tmp/keel"));
        assert_eq!(cli.logs.verbosity, 2);
        match cli.command {
            Commands::Daemon(args) => {
                assert!(args.init);
                assert_eq!(args.config, Some(PathBuf::from("patch.toml")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_metrics_flags() {
        let cli = Cli::try_parse_from(["keel", "daemon", "--metrics", "--metrics.port", "9100"])
            .unwrap();
        match cli.command {
            Commands::Daemon(args) => {
                assert!(args.metrics.enabled);
                assert_eq!(args.metrics.listen_addr().to_string(), "127.0.0.1:9100");
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["keel", "daemon"]).unwrap();
        assert!(matches!(cli.command, Commands::Daemon(args) if !args.metrics.enabled));
    }

    #[test]
    fn parses_nested_subcommands() {
        let cli =
            Cli::try_parse_from(["keel", "swarm-key", "generate", "--out", "swarm.key"]).unwrap();
        assert!(matches!(cli.command, Commands::SwarmKey(SwarmKeyCommand::Generate { .. })));

        let cli = Cli::try_parse_from(["keel", "config", "show"]).unwrap();
        assert!(matches!(cli.command, Commands::Config(ConfigCommand::Show)));
    }
}
