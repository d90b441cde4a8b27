//! Prometheus metrics for the API Box server

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

/// Initialize all metric descriptions
pub fn init_metrics() {
    describe_counter!(
        "apibox_authorization_requests_total",
        "Total number of route authorization decisions"
    );
    describe_counter!(
        "apibox_remote_not_found_total",
        "Requests naming a remote that is not configured"
    );
    describe_counter!(
        "apibox_reload_events_total",
        "Configuration reload attempts by outcome"
    );
    describe_histogram!(
        "apibox_authorization_latency_seconds",
        "Route authorization latency in seconds"
    );
    describe_histogram!("apibox_batch_size", "Batch authorization request size");
    describe_gauge!("apibox_loaded_remotes", "Number of configured remotes");
}

/// Record one authorization decision
pub fn record_authorization(decision: &str, latency_seconds: f64) {
    counter!("apibox_authorization_requests_total", "decision" => decision.to_string()).increment(1);
    histogram!("apibox_authorization_latency_seconds").record(latency_seconds);
}

/// Record a lookup for an unknown remote
pub fn record_remote_not_found() {
    counter!("apibox_remote_not_found_total").increment(1);
}

/// Record a batch authorization request
pub fn record_batch(count: usize) {
    histogram!("apibox_batch_size").record(count as f64);
}

/// Record a reload attempt
pub fn record_reload(result: &str) {
    counter!("apibox_reload_events_total", "result" => result.to_string()).increment(1);
}

/// Update the configured remote count
pub fn update_loaded_remotes(count: usize) {
    gauge!("apibox_loaded_remotes").set(count as f64);
}

/// Storage for Prometheus handle
static PROMETHEUS_HANDLE: std::sync::OnceLock<metrics_exporter_prometheus::PrometheusHandle> =
    std::sync::OnceLock::new();

/// Install the Prometheus recorder
pub fn init_prometheus() -> anyhow::Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;
    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| anyhow::anyhow!("Failed to set Prometheus handle"))?;
    Ok(())
}

/// Render metrics in Prometheus text format
pub fn get_prometheus_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Prometheus metrics not initialized\n".to_string())
}
