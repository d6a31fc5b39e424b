//! # Metrics Collection
//!
//! Prometheus metrics for authentication outcomes.

use crate::errors::{Error, Result};
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Install the Prometheus exporter on the given address and register
/// metric descriptions.
pub fn init_metrics(bind_address: &str) -> Result<()> {
    let address: SocketAddr = bind_address
        .parse()
        .map_err(|e| Error::config(format!("Invalid metrics bind address: {}", e)))?;

    PrometheusBuilder::new()
        .with_http_listener(address)
        .install()
        .map_err(|e| Error::config(format!("Failed to install metrics exporter: {}", e)))?;

    describe_counter!("auth_attempts_total", "Authentication attempts by outcome");
    describe_counter!("auth_tokens_issued_total", "Issued tokens by kind");
    describe_counter!("auth_refresh_total", "Refresh attempts by outcome");
    describe_counter!("auth_password_resets_total", "Password reset operations by outcome");

    info!(address = %address, "Prometheus metrics exporter started");
    Ok(())
}

/// Record a login attempt outcome
/// ("success", "invalid_credentials", …).
pub async fn record_authentication(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("auth_attempts_total", &labels).increment(1);
}

/// Record an issued token pair.
pub async fn record_tokens_issued(count: u64) {
    counter!("auth_tokens_issued_total").increment(count);
}

/// Record a refresh attempt outcome
/// ("success", "expired", "reuse_detected", …).
pub async fn record_refresh(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("auth_refresh_total", &labels).increment(1);
}

/// Record a password-reset operation outcome
/// ("requested", "delivery_failed", "consumed", "invalid_or_expired").
pub async fn record_password_reset(outcome: &str) {
    let labels = [("outcome", outcome.to_string())];
    counter!("auth_password_resets_total", &labels).increment(1);
}
