use std::sync::atomic::{AtomicU64, Ordering};

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tidings_model::{normalize_content, ClientFrame, Envelope, EventKind};
use tokio::sync::mpsc;
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};

use crate::hub::{HubHandle, SessionHandle, SessionKey};

/// Maximum inbound frame size; the upgrade enforces it at the socket.
pub const MAX_FRAME_BYTES: usize = 512;

const OUTBOUND_QUEUE: usize = 256;
const READ_DEADLINE: Duration = Duration::from_secs(60);
const PING_PERIOD: Duration = Duration::from_secs(54);
const WRITE_DEADLINE: Duration = Duration::from_secs(10);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Drive one client connection from upgrade to unregister. The read pump
/// runs in this task; the write pump gets its own. The two share nothing
/// but the outbound queue; the socket halves are split between them.
pub async fn run(socket: WebSocket, hub: HubHandle, user_id: String, channel_id: String) {
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE);
    let session = SessionHandle {
        id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
        user_id,
        channel_id,
        outbound: outbound_tx,
    };
    let key = session.key();
    hub.register(session).await;

    let (sender, receiver) = socket.split();
    let write_task = tokio::spawn(write_pump(sender, outbound_rx));

    read_pump(receiver, &hub, &key).await;

    // Unregistering drops the hub's handles, which closes the outbound
    // queue and lets the write pump say goodbye.
    hub.unregister(key).await;
    let _ = write_task.await;
}

async fn read_pump(mut receiver: SplitStream<WebSocket>, hub: &HubHandle, key: &SessionKey) {
    loop {
        let frame = match timeout(READ_DEADLINE, receiver.next()).await {
            Err(_) => {
                tracing::info!(user_id = %key.user_id, "read deadline expired");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(err))) => {
                tracing::info!(user_id = %key.user_id, error = %err, "websocket receive error");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => {
                let envelope = envelope_from_frame(&text, &key.user_id, &key.channel_id);
                if !hub.broadcast(envelope).await {
                    break;
                }
            }
            Message::Close(_) => break,
            // Pongs (and any other control frame) just proved liveness;
            // the deadline resets on the next loop turn.
            _ => {}
        }
    }
}

async fn write_pump(mut sender: SplitSink<WebSocket, Message>, mut outbound: mpsc::Receiver<String>) {
    let mut ping = interval(PING_PERIOD);
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            delivery = outbound.recv() => {
                let Some(mut frame) = delivery else {
                    // Queue closed by the hub.
                    let _ = timeout(WRITE_DEADLINE, sender.send(Message::Close(None))).await;
                    break;
                };
                // Coalesce whatever is already queued into the same frame.
                while let Ok(next) = outbound.try_recv() {
                    frame.push('\n');
                    frame.push_str(&next);
                }
                match timeout(WRITE_DEADLINE, sender.send(Message::Text(frame.into()))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
            _ = ping.tick() => {
                match timeout(WRITE_DEADLINE, sender.send(Message::Ping(Vec::new().into()))).await {
                    Ok(Ok(())) => {}
                    _ => break,
                }
            }
        }
    }
}

/// Turn a raw inbound frame into an envelope stamped with the session's
/// identity. A frame that parses as JSON with a known, non-empty `type`
/// keeps that type and content; anything else is plain message content.
fn envelope_from_frame(raw: &str, user_id: &str, channel_id: &str) -> Envelope {
    let normalized = normalize_content(raw);
    let (kind, content) = match serde_json::from_str::<ClientFrame>(&normalized) {
        Ok(ClientFrame {
            kind: Some(kind),
            content,
        }) => (kind, content),
        _ => (EventKind::Message, normalized),
    };
    Envelope {
        id: 0,
        channel_id: channel_id.to_string(),
        user_id: user_id.to_string(),
        content,
        kind,
        timestamp: Some(Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_text_becomes_a_message() {
        let env = envelope_from_frame("hello there", "alice", "general");
        assert_eq!(env.kind, EventKind::Message);
        assert_eq!(env.content, "hello there");
        assert_eq!(env.channel_id, "general");
        assert_eq!(env.user_id, "alice");
        assert_eq!(env.id, 0);
        assert!(env.timestamp.is_some());
    }

    #[test]
    fn typed_frames_keep_their_kind() {
        let env = envelope_from_frame(r#"{"type":"typing","content":""}"#, "alice", "general");
        assert_eq!(env.kind, EventKind::Typing);
        assert_eq!(env.content, "");
    }

    #[test]
    fn empty_type_falls_back_to_raw_content() {
        let raw = r#"{"type":"","content":"x"}"#;
        let env = envelope_from_frame(raw, "alice", "general");
        assert_eq!(env.kind, EventKind::Message);
        assert_eq!(env.content, raw);
    }

    #[test]
    fn unknown_json_is_treated_as_content() {
        let env = envelope_from_frame(r#"{"foo":1}"#, "alice", "general");
        assert_eq!(env.kind, EventKind::Message);
        assert_eq!(env.content, r#"{"foo":1}"#);
    }

    #[test]
    fn newlines_are_normalized_before_parsing() {
        let env = envelope_from_frame("  line one\nline two  ", "alice", "general");
        assert_eq!(env.content, "line one line two");
    }
}
