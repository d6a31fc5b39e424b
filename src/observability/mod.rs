//! # Observability Infrastructure
//!
//! Structured logging via the tracing ecosystem and Prometheus-exported
//! metrics for authentication outcomes.

pub mod metrics;

use crate::config::ObservabilityConfig;
use crate::errors::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging and, when enabled, the metrics exporter.
pub fn init_observability(config: &ObservabilityConfig) -> Result<()> {
    init_tracing(config)?;

    if let Some(address) = config.metrics_bind_address() {
        metrics::init_metrics(&address)?;
    }

    info!(
        service_name = %config.service_name,
        log_level = %config.log_level,
        metrics_enabled = %config.enable_metrics,
        "Observability initialized"
    );

    Ok(())
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured log level; JSON output
/// is switched by configuration.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logging {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    // A subscriber may already be installed (tests); that is not fatal.
    if let Err(err) = result {
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }

    Ok(())
}
