//! Observability for keel nodes: tracing subscriber setup and the Prometheus
//! exporter behind the `metrics` counters recorded across the workspace.

mod logging;
mod prometheus;

pub use logging::{LogArgs, init_logging};
pub use prometheus::{DEFAULT_METRICS_PORT, MetricsArgs, install_metrics};
