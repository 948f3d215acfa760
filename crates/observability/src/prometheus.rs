use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::Args;
use eyre::{Result, WrapErr};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

/// Default port of the Prometheus scrape endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9464;

/// Metrics exporter configuration.
#[derive(Debug, Args, Clone, PartialEq, Eq)]
#[command(next_help_heading = "Metrics")]
pub struct MetricsArgs {
    /// Serve Prometheus metrics over HTTP.
    #[arg(long = "metrics")]
    pub enabled: bool,

    /// Address the metrics endpoint binds to.
    #[arg(long = "metrics.addr", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub addr: IpAddr,

    /// Port the metrics endpoint binds to.
    #[arg(long = "metrics.port", default_value_t = DEFAULT_METRICS_PORT)]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_METRICS_PORT,
        }
    }
}

impl MetricsArgs {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// Install the global Prometheus recorder and serve it over HTTP.
///
/// Does nothing unless `--metrics` is set. Must be called from within a tokio
/// runtime; the HTTP listener is spawned onto it.
pub fn install_metrics(args: &MetricsArgs) -> Result<Option<SocketAddr>> {
    if !args.enabled {
        return Ok(None);
    }

    let addr = args.listen_addr();
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .wrap_err_with(|| format!("failed to install prometheus exporter on {addr}"))?;

    info!(%addr, "serving prometheus metrics");
    Ok(Some(addr))
}
