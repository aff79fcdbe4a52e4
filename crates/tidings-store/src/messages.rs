use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{decode_err, Store, StoreError};

/// A row of the history table. The table is partitioned by channel and
/// clustered by id descending, so reads come back most-recent-first.
#[derive(Debug, Clone, Serialize)]
pub struct StoredMessage {
    pub channel_id: String,
    pub id: i64,
    pub user_id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Idempotent under broker redelivery: the snowflake id is stable per
/// record, so a duplicate insert overwrites identical data.
pub async fn insert(
    store: &Store,
    channel_id: &str,
    id: i64,
    user_id: &str,
    content: &str,
    timestamp: DateTime<Utc>,
) -> Result<(), StoreError> {
    store
        .session()
        .query_unpaged(
            "INSERT INTO messages (channel_id, id, user_id, content, timestamp) \
             VALUES (?, ?, ?, ?, ?)",
            (channel_id, id, user_id, content, timestamp),
        )
        .await?;
    Ok(())
}

pub async fn channel_history(
    store: &Store,
    channel_id: &str,
    limit: i32,
) -> Result<Vec<StoredMessage>, StoreError> {
    let result = store
        .session()
        .query_unpaged(
            "SELECT channel_id, id, user_id, content, timestamp \
             FROM messages WHERE channel_id = ? LIMIT ?",
            (channel_id, limit),
        )
        .await?;

    let mut messages = Vec::new();
    for row in result
        .into_rows_result()
        .map_err(decode_err)?
        .rows::<(String, i64, String, String, DateTime<Utc>)>()
        .map_err(decode_err)?
    {
        let (channel_id, id, user_id, content, timestamp) = row.map_err(decode_err)?;
        messages.push(StoredMessage {
            channel_id,
            id,
            user_id,
            content,
            timestamp,
        });
    }
    Ok(messages)
}
