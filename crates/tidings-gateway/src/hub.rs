use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rdkafka::Message;
use tidings_model::{Channel, Envelope, EventKind};
use tidings_store::Presence;
use tidings_util::Snowflake;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

const EVENT_QUEUE: usize = 1024;

/// A live client connection as the hub sees it: identity, focused channel,
/// and the sending half of its outbound queue.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: u64,
    pub user_id: String,
    pub channel_id: String,
    pub outbound: mpsc::Sender<String>,
}

impl SessionHandle {
    pub fn key(&self) -> SessionKey {
        SessionKey {
            id: self.id,
            user_id: self.user_id.clone(),
            channel_id: self.channel_id.clone(),
        }
    }
}

/// Enough to find a session in both maps without holding its queue open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey {
    pub id: u64,
    pub user_id: String,
    pub channel_id: String,
}

/// The hub's twin maps. `by_channel` answers plain-channel fanout;
/// `by_user` lets a DM reach every open session its participants hold,
/// whatever channel those sessions are focused on.
#[derive(Default)]
pub struct Registry {
    by_channel: HashMap<String, HashMap<u64, SessionHandle>>,
    by_user: HashMap<String, HashMap<u64, SessionHandle>>,
}

impl Registry {
    fn insert(&mut self, session: SessionHandle) {
        self.by_channel
            .entry(session.channel_id.clone())
            .or_default()
            .insert(session.id, session.clone());
        self.by_user
            .entry(session.user_id.clone())
            .or_default()
            .insert(session.id, session);
    }

    /// Idempotent removal. Dropping the stored handles closes the
    /// session's outbound queue once the last clone is gone; empty buckets
    /// are pruned. Returns whether the session was present.
    fn remove(&mut self, key: &SessionKey) -> bool {
        let mut removed = false;
        if let Some(bucket) = self.by_channel.get_mut(&key.channel_id) {
            removed |= bucket.remove(&key.id).is_some();
            if bucket.is_empty() {
                self.by_channel.remove(&key.channel_id);
            }
        }
        if let Some(bucket) = self.by_user.get_mut(&key.user_id) {
            removed |= bucket.remove(&key.id).is_some();
            if bucket.is_empty() {
                self.by_user.remove(&key.user_id);
            }
        }
        removed
    }

    /// Fan an already-serialized envelope out to local recipients without
    /// blocking. Sessions whose queue is full (or gone) are returned for
    /// eviction; the caller applies those under the write lock, never
    /// here under the read lock.
    fn route(&self, channel: &Channel, payload: &str) -> Vec<SessionKey> {
        let mut evicted = Vec::new();
        match channel {
            Channel::Dm(a, b) => {
                for user_id in [a.as_str(), b.as_str()] {
                    if let Some(bucket) = self.by_user.get(user_id) {
                        deliver(bucket, payload, &mut evicted);
                    }
                }
            }
            Channel::Plain(name) => {
                if let Some(bucket) = self.by_channel.get(name) {
                    deliver(bucket, payload, &mut evicted);
                }
            }
        }
        evicted
    }
}

fn deliver(bucket: &HashMap<u64, SessionHandle>, payload: &str, evicted: &mut Vec<SessionKey>) {
    for session in bucket.values() {
        if session.outbound.try_send(payload.to_string()).is_err() {
            evicted.push(session.key());
        }
    }
}

/// Cloneable endpoint sessions use to talk to the hub.
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<SessionHandle>,
    unregister_tx: mpsc::Sender<SessionKey>,
    broadcast_tx: mpsc::Sender<Envelope>,
}

impl HubHandle {
    pub async fn register(&self, session: SessionHandle) {
        let _ = self.register_tx.send(session).await;
    }

    pub async fn unregister(&self, key: SessionKey) {
        let _ = self.unregister_tx.send(key).await;
    }

    /// Submit an envelope for cluster-wide delivery. Returns false when
    /// the hub has shut down.
    pub async fn broadcast(&self, envelope: Envelope) -> bool {
        self.broadcast_tx.send(envelope).await.is_ok()
    }
}

/// One long-lived task per gateway process. Serializes all structural
/// mutation of the registry through its queues; the fanout consumer only
/// ever takes the read lock while enumerating recipients.
pub struct Hub {
    registry: Arc<RwLock<Registry>>,
    ids: Snowflake,
    producer: FutureProducer,
    topic: String,
    presence: Presence,
    register_rx: mpsc::Receiver<SessionHandle>,
    unregister_rx: mpsc::Receiver<SessionKey>,
    broadcast_rx: mpsc::Receiver<Envelope>,
}

impl Hub {
    pub fn new(
        ids: Snowflake,
        producer: FutureProducer,
        topic: String,
        presence: Presence,
    ) -> (Hub, HubHandle) {
        let (register_tx, register_rx) = mpsc::channel(EVENT_QUEUE);
        let (unregister_tx, unregister_rx) = mpsc::channel(EVENT_QUEUE);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(EVENT_QUEUE);
        let hub = Hub {
            registry: Arc::new(RwLock::new(Registry::default())),
            ids,
            producer,
            topic,
            presence,
            register_rx,
            unregister_rx,
            broadcast_rx,
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
        };
        (hub, handle)
    }

    pub fn registry(&self) -> Arc<RwLock<Registry>> {
        self.registry.clone()
    }

    pub async fn run(mut self) {
        loop {
            tokio::select! {
                Some(session) = self.register_rx.recv() => self.handle_register(session).await,
                Some(key) = self.unregister_rx.recv() => self.handle_unregister(key).await,
                Some(envelope) = self.broadcast_rx.recv() => self.publish(envelope).await,
                else => break,
            }
        }
    }

    async fn handle_register(&self, session: SessionHandle) {
        let user_id = session.user_id.clone();
        let channel_id = session.channel_id.clone();
        self.registry.write().unwrap().insert(session);

        if let Err(err) = self.presence.join(&channel_id, &user_id).await {
            tracing::warn!(%user_id, %channel_id, error = %err, "failed to record presence");
        }
        tracing::info!(%user_id, %channel_id, "session registered");

        // The join event goes through the broker so peers on other
        // gateway instances see it too.
        self.publish(presence_envelope(&channel_id, &user_id, "joined"))
            .await;
    }

    async fn handle_unregister(&self, key: SessionKey) {
        if !self.registry.write().unwrap().remove(&key) {
            return;
        }

        if let Err(err) = self.presence.leave(&key.channel_id, &key.user_id).await {
            tracing::warn!(
                user_id = %key.user_id,
                channel_id = %key.channel_id,
                error = %err,
                "failed to clear presence"
            );
        }
        tracing::info!(user_id = %key.user_id, channel_id = %key.channel_id, "session unregistered");

        self.publish(presence_envelope(&key.channel_id, &key.user_id, "left"))
            .await;
    }

    /// Stamp and publish. Publish failures are logged; the submitter is
    /// never notified (delivery receipts are a non-goal).
    async fn publish(&self, mut envelope: Envelope) {
        if envelope.id == 0 {
            envelope.id = self.ids.generate();
        }
        if envelope.timestamp.is_none() {
            envelope.timestamp = Some(Utc::now());
        }

        let payload = match serde_json::to_string(&envelope) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize envelope");
                return;
            }
        };

        let record = FutureRecord::<(), _>::to(&self.topic).payload(&payload);
        match self
            .producer
            .send(record, Timeout::After(Duration::from_secs(5)))
            .await
        {
            Ok(_) => {
                tracing::debug!(id = envelope.id, channel_id = %envelope.channel_id, "envelope published")
            }
            Err((err, _)) => tracing::error!(error = %err, "failed to publish envelope"),
        }
    }
}

fn presence_envelope(channel_id: &str, user_id: &str, content: &str) -> Envelope {
    Envelope {
        id: 0,
        channel_id: channel_id.to_string(),
        user_id: user_id.to_string(),
        content: content.to_string(),
        kind: EventKind::Presence,
        timestamp: Some(Utc::now()),
    }
}

/// Build the fanout consumer: a per-instance unique group id means every
/// gateway sees every envelope (broadcast, not work-sharing), and starting
/// at the latest offset means no history replay on restart.
pub fn fanout_consumer(brokers: &[String], topic: &str) -> Result<StreamConsumer, KafkaError> {
    let group_id = format!("gateway-{}", Uuid::new_v4());
    let consumer: StreamConsumer = ClientConfig::new()
        .set("group.id", &group_id)
        .set("bootstrap.servers", brokers.join(","))
        .set("auto.offset.reset", "latest")
        .set("enable.auto.commit", "true")
        .create()?;
    consumer.subscribe(&[topic])?;
    Ok(consumer)
}

pub fn spawn_fanout(registry: Arc<RwLock<Registry>>, consumer: StreamConsumer) -> JoinHandle<()> {
    tokio::spawn(async move {
        // TODO: reconnect with backoff instead of degrading to
        // local-submissions-only after a consumer error.
        loop {
            let message = match consumer.recv().await {
                Ok(message) => message,
                Err(err) => {
                    tracing::error!(error = %err, "gateway consumer error");
                    break;
                }
            };
            let Some(Ok(payload)) = message.payload_view::<str>() else {
                tracing::warn!("skipping non-utf8 broker payload");
                continue;
            };
            let envelope: Envelope = match serde_json::from_str(payload) {
                Ok(envelope) => envelope,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to decode broker envelope");
                    continue;
                }
            };
            let channel = match Channel::parse(&envelope.channel_id) {
                Ok(channel) => channel,
                Err(_) => {
                    tracing::warn!(channel_id = %envelope.channel_id, "dropping envelope with malformed channel");
                    continue;
                }
            };

            let evicted = registry.read().unwrap().route(&channel, payload);
            if !evicted.is_empty() {
                let mut registry = registry.write().unwrap();
                for key in evicted {
                    if registry.remove(&key) {
                        tracing::warn!(
                            user_id = %key.user_id,
                            channel_id = %key.channel_id,
                            "dropping slow consumer"
                        );
                    }
                }
            }
        }
    })
}
