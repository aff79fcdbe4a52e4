use tidings_core::Config;
use tidings_store::Store;
use tracing_subscriber::EnvFilter;

mod consumer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tidings=info")),
        )
        .init();

    let config = Config::from_env();
    let store = Store::connect(&config.scylla_hosts, &config.keyspace).await?;
    let worker = consumer::PersistWorker::new(&config.kafka_brokers, &config.topic, store)?;

    tracing::info!(group = consumer::GROUP_ID, topic = %config.topic, "starting persistence consumer");
    worker.run().await;
    Ok(())
}
