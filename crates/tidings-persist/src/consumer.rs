use std::time::Duration;

use chrono::Utc;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::error::KafkaError;
use rdkafka::Message;
use tidings_model::{Channel, Envelope};
use tidings_store::{conversations, counters, messages, Store};

/// Stable shared group id: broker-level work-sharing spreads writes
/// across persistence replicas, unlike the gateways' per-instance groups.
pub const GROUP_ID: &str = "messaging-service-group";

/// The rows one DM envelope produces beyond its history entry: a
/// conversation-index touch per participant, and an unread bump for the
/// recipient when the sender is a participant.
#[derive(Debug, PartialEq, Eq)]
struct DmPlan<'a> {
    touches: [(&'a str, &'a str); 2],
    recipient: Option<&'a str>,
}

fn dm_plan<'a>(channel: &'a Channel, sender: &'a str) -> Option<DmPlan<'a>> {
    let (u1, u2) = channel.dm_participants()?;
    Some(DmPlan {
        touches: [(u1, u2), (u2, u1)],
        recipient: channel.dm_peer(sender),
    })
}

pub struct PersistWorker {
    consumer: StreamConsumer,
    store: Store,
}

impl PersistWorker {
    pub fn new(brokers: &[String], topic: &str, store: Store) -> Result<PersistWorker, KafkaError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("group.id", GROUP_ID)
            .set("bootstrap.servers", brokers.join(","))
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.commit", "false")
            .create()?;
        consumer.subscribe(&[topic])?;
        Ok(PersistWorker { consumer, store })
    }

    pub async fn run(&self) {
        loop {
            let message = match self.consumer.recv().await {
                Ok(message) => message,
                Err(err) => {
                    tracing::error!(error = %err, "error reading from broker, retrying in 1s");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            let committable = match message.payload_view::<str>() {
                Some(Ok(payload)) => match serde_json::from_str::<Envelope>(payload) {
                    Ok(envelope) => self.apply(&envelope).await,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to decode envelope, skipping");
                        true
                    }
                },
                _ => {
                    tracing::warn!("skipping empty or non-utf8 record");
                    true
                }
            };

            // Offsets move only after a clean round; a failed write stays
            // uncommitted so a restart replays it (at-least-once).
            if committable {
                if let Err(err) = self.consumer.commit_message(&message, CommitMode::Async) {
                    tracing::warn!(error = %err, "failed to commit offset");
                }
            }
        }
    }

    /// Materialize one envelope. Returns whether its offset may be
    /// committed.
    async fn apply(&self, envelope: &Envelope) -> bool {
        // typing / presence / read_receipt are real-time only.
        if envelope.kind.is_ephemeral() {
            tracing::debug!(kind = ?envelope.kind, "skipping ephemeral envelope");
            return true;
        }

        let timestamp = envelope.timestamp.unwrap_or_else(Utc::now);
        let mut clean = true;

        if let Err(err) = messages::insert(
            &self.store,
            &envelope.channel_id,
            envelope.id,
            &envelope.user_id,
            &envelope.content,
            timestamp,
        )
        .await
        {
            tracing::error!(id = envelope.id, error = %err, "failed to save message");
            clean = false;
        } else {
            tracing::debug!(id = envelope.id, channel_id = %envelope.channel_id, "message saved");
        }

        let Ok(channel) = Channel::parse(&envelope.channel_id) else {
            return clean;
        };
        let Some(plan) = dm_plan(&channel, &envelope.user_id) else {
            return clean;
        };

        for (user, other) in plan.touches {
            if let Err(err) = conversations::touch(&self.store, user, other, timestamp).await {
                tracing::error!(user_id = user, error = %err, "failed to update conversation");
                clean = false;
            }
        }
        if let Some(recipient) = plan.recipient {
            if let Err(err) = counters::increment(&self.store, recipient, &envelope.user_id).await {
                tracing::error!(recipient, error = %err, "failed to increment unread count");
                clean = false;
            }
        }
        clean
    }
}
