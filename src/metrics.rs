// src/metrics.rs
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

pub const EVENTS_SENT: &str = "producer_events_sent_total";
pub const SEND_ERRORS: &str = "producer_send_errors_total";
pub const SEND_MS: &str = "producer_send_ms";
pub const LAST_SENT_TS: &str = "producer_last_sent_ts";

/// One-time metrics registration (so series show up before the first send).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(EVENTS_SENT, "Events delivered to the broker.");
        describe_counter!(SEND_ERRORS, "Batch sends that failed.");
        describe_histogram!(SEND_MS, "Batch send latency in milliseconds.");
        describe_gauge!(LAST_SENT_TS, "Unix ts of the last delivered event.");
    });
}

/// Install the Prometheus recorder with its own HTTP listener on `addr`.
/// Must be called from inside a tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("prometheus: install exporter on {addr}: {e}"))?;
    ensure_metrics_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}
