use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    // try_init: tests and embedding callers may have installed one already
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

#[cfg(feature = "metrics-exporter")]
pub fn init_metrics(port: u16) -> Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    use crate::error::VeilError;

    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .map_err(|e| VeilError::Config(config::ConfigError::Message(format!("metrics exporter: {}", e))))?;

    tracing::info!(port, "prometheus exporter listening on /metrics");
    metrics::gauge!("veil_up").set(1.0);
    Ok(())
}

#[cfg(not(feature = "metrics-exporter"))]
pub fn init_metrics(_port: u16) -> Result<()> {
    Ok(())
}
