use axum::{routing::get, Router};
use rdkafka::config::ClientConfig;
use rdkafka::producer::FutureProducer;
use tidings_core::Config;
use tidings_store::Presence;
use tidings_util::Snowflake;
use tracing_subscriber::EnvFilter;

mod hub;
mod session;
mod ws;

use hub::Hub;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tidings=info")),
        )
        .init();

    let config = Config::from_env();

    let ids = Snowflake::new(config.node_id)?;
    let presence = Presence::connect(&config.redis_addr).await?;
    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", config.kafka_brokers.join(","))
        .set("message.timeout.ms", "5000")
        .create()?;
    let consumer = hub::fanout_consumer(&config.kafka_brokers, &config.topic)?;

    let (hub, handle) = Hub::new(ids, producer, config.topic.clone(), presence);
    let registry = hub.registry();
    tokio::spawn(hub.run());
    hub::spawn_fanout(registry, consumer);

    let state = ws::GatewayState {
        hub: handle,
        jwt_secret: config.jwt_secret.clone(),
    };
    let app = Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.gateway_bind).await?;
    tracing::info!(addr = %config.gateway_bind, "gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
