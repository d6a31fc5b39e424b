use streamgate::{
    api::{build_router, ApiState},
    config::{AppConfig, ObservabilityConfig},
    observability::init_observability,
    storage::create_pool,
    Result, APP_NAME, VERSION,
};
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (optional - won't fail if missing).
    // This must happen before any config is read from the environment.
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let observability_config = ObservabilityConfig::from_env();
    init_observability(&observability_config)?;

    info!(app_name = APP_NAME, version = VERSION, "Starting StreamGate authentication service");

    let config = AppConfig::from_env()?;
    info!(
        server_address = %config.server.bind_address(),
        metrics_enabled = %config.observability.enable_metrics,
        "Loaded configuration from environment"
    );

    let pool = create_pool(&config.database).await?;

    let state = ApiState::from_config(pool, &config)?;
    let router = build_router(state, config.server.enable_cors);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    info!(address = %config.server.bind_address(), "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(streamgate::Error::Io)?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
