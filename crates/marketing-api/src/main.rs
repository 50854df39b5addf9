use anyhow::Result;
use axum::Router;
use marketing_api::{config::ApiConfig, routes::build_router, state::AppState};
use marketing_core::{TelemetryOptions, init_telemetry, metrics::init_metrics_from_env};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry(TelemetryOptions::default().with_level("info,marketing_core=info"))?;
    init_metrics_from_env("marketing-api");

    let config = ApiConfig::from_env()?;
    let state = AppState::try_from_config(&config).map_err(|err| {
        error!(error = %err, "startup configuration rejected");
        err
    })?;

    let app: Router = build_router(state);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(
        address = %config.listen_addr,
        max_concurrency = config.max_concurrency,
        history_capacity = config.history_capacity,
        "marketing-api listening"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            error!(error = %err, "server shutdown with error");
            err
        })?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            stream.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received");
}
