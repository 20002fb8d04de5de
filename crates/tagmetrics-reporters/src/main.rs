//! tagmetrics exporter
//!
//! Serves the aggregated Prometheus view on `/metrics`.
//! Config path: first argument, default `tagmetrics.yaml`.

use std::net::SocketAddr;

use tracing_subscriber::{fmt, EnvFilter};

use tagmetrics_reporters::{app_state, config, router};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run().await {
        tracing::error!(code = e.code().as_str(), error = %e, "tagmetrics-exporter failed");
        std::process::exit(1);
    }
}

async fn run() -> tagmetrics_core::Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "tagmetrics.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .prometheus
        .listen
        .parse()
        .map_err(|e| tagmetrics_core::TagMetricsError::InvalidConfig(format!("listen: {e}")))?;

    let state = app_state::AppState::new(cfg)?;
    let app = router::build_router(state.clone());

    tracing::info!(%listen, statsd = state.cfg().statsd.is_some(), "tagmetrics-exporter starting");
    let listener = tokio::net::TcpListener::bind(listen).await?;

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    state.close();
    served?;
    Ok(())
}
