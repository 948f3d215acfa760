//! Logging setup for keel.
//!
//! The filter is built with the following precedence:
//! 1. If `--quiet` is set, only errors are shown
//! 2. Otherwise, start with `RUST_LOG` if set, or a level derived from `-v` flags
//! 3. Apply any custom directives from `--log.filter`

use clap::Args;
use eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Args, Clone, Default)]
#[command(next_help_heading = "Logging")]
pub struct LogArgs {
    /// Silence all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Log filter directive (e.g., "keel=debug,libp2p=info").
    #[arg(long = "log.filter", value_name = "DIRECTIVE", global = true)]
    pub filter: Option<String>,

    /// Use JSON format for log output.
    #[arg(long = "log.json", global = true)]
    pub json: bool,
}

impl LogArgs {
    /// Build the [`EnvFilter`] these arguments describe.
    pub fn env_filter(&self) -> EnvFilter {
        if self.quiet {
            return EnvFilter::new("error");
        }

        let base_level = match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };

        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base_level));

        if let Some(custom) = &self.filter {
            for directive in custom.split(',').filter(|d| !d.trim().is_empty()) {
                match directive.trim().parse() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(e) => eprintln!("ignoring invalid log directive {directive:?}: {e}"),
                }
            }
        }

        filter
    }
}

/// Install the global tracing subscriber.
pub fn init_logging(args: &LogArgs) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(args.env_filter());

    let installed = if args.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| eyre!("failed to install tracing subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_overrides_verbosity() {
        let args = LogArgs {
            quiet: true,
            verbosity: 2,
            ..Default::default()
        };
        assert_eq!(args.env_filter().to_string(), "error");
    }

    #[test]
    fn custom_directives_are_appended() {
        let args = LogArgs {
            filter: Some("keel_swarm_node=trace, ,libp2p=warn".to_string()),
            ..Default::default()
        };
        let rendered = args.env_filter().to_string();
        assert!(rendered.contains("keel_swarm_node=trace"));
        assert!(rendered.contains("libp2p=warn"));
    }
}
