use tidings_api::{build_router, ApiState};
use tidings_core::Config;
use tidings_store::{Presence, Store};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tidings=info")),
        )
        .init();

    let config = Config::from_env();
    let store = Store::connect(&config.scylla_hosts, &config.keyspace).await?;
    let presence = Presence::connect(&config.redis_addr).await?;

    let app = build_router().with_state(ApiState {
        store,
        presence,
        jwt_secret: config.jwt_secret.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.api_bind).await?;
    tracing::info!(addr = %config.api_bind, "read API listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
