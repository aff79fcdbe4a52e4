use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of event carried by an [`Envelope`].
///
/// Only `message` survives to the history table; the other kinds are
/// delivered in real time and then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Message,
    Typing,
    Presence,
    ReadReceipt,
}

impl EventKind {
    pub fn is_ephemeral(self) -> bool {
        !matches!(self, EventKind::Message)
    }
}

/// The canonical record exchanged on the wire, on the broker, and in the
/// store. `id == 0` and `timestamp == None` mean "not yet assigned"; the
/// hub stamps both before publishing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: i64,
    pub channel_id: String,
    pub user_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// What a client may send over the socket as JSON. Clients that send a bare
/// string instead are treated as `{type: "message", content: <frame>}`.
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "type", default)]
    pub kind: Option<EventKind>,
    #[serde(default)]
    pub content: String,
}

/// Collapse newlines to spaces and trim surrounding whitespace.
pub fn normalize_content(raw: &str) -> String {
    raw.replace('\n', " ").trim().to_string()
}
