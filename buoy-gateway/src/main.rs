use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use vision_bridge::OpenAiClient;

use buoy_gateway::{
    api, config::BridgeConfig, metrics, mqtt::BrokerClient, worker, BridgeState, InferenceBridge,
    TopicRouter,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    let _ = dotenvy::dotenv();

    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        buoy_gateway::init_tracing_json("buoy_gateway");
    } else {
        buoy_gateway::init_tracing("buoy_gateway");
    }

    let config = BridgeConfig::from_env().context("Invalid gateway configuration")?;
    metrics::init_metrics().context("Failed to install Prometheus recorder")?;

    let state = Arc::new(BridgeState::new());

    // Inference worker
    let client = OpenAiClient::new(config.inference.client_config())?;
    let bridge = InferenceBridge::new(
        Arc::new(client),
        state.clone(),
        config.inference.model.clone(),
        config.inference.max_tokens,
    );
    let (tx, rx) = worker::queue(config.worker_queue_capacity);
    tokio::spawn(worker::InferenceWorker::new(bridge, config.image_path.clone(), rx).run());

    // Broker client
    let router = TopicRouter::new(config.mqtt.routes());
    tokio::spawn(BrokerClient::new(&config.mqtt, router, tx, state.clone()).run());

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!(
        bind_addr = %config.bind_addr,
        model = %config.inference.model,
        "Buoy gateway starting"
    );

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Buoy gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
