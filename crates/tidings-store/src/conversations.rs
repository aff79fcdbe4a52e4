use chrono::{DateTime, Utc};

use crate::{decode_err, Store, StoreError};

#[derive(Debug, Clone)]
pub struct ConversationRow {
    pub user_id: String,
    pub other_user_id: String,
    pub last_updated: DateTime<Utc>,
}

/// Record DM activity between `user_id` and `other_user_id`. Called once
/// per participant, so both sides of the conversation index stay current.
pub async fn touch(
    store: &Store,
    user_id: &str,
    other_user_id: &str,
    last_updated: DateTime<Utc>,
) -> Result<(), StoreError> {
    store
        .session()
        .query_unpaged(
            "INSERT INTO user_conversations (user_id, other_user_id, last_updated) \
             VALUES (?, ?, ?)",
            (user_id, other_user_id, last_updated),
        )
        .await?;
    Ok(())
}

pub async fn list(store: &Store, user_id: &str) -> Result<Vec<ConversationRow>, StoreError> {
    let result = store
        .session()
        .query_unpaged(
            "SELECT user_id, other_user_id, last_updated \
             FROM user_conversations WHERE user_id = ?",
            (user_id,),
        )
        .await?;

    let mut conversations = Vec::new();
    for row in result
        .into_rows_result()
        .map_err(decode_err)?
        .rows::<(String, String, DateTime<Utc>)>()
        .map_err(decode_err)?
    {
        let (user_id, other_user_id, last_updated) = row.map_err(decode_err)?;
        conversations.push(ConversationRow {
            user_id,
            other_user_id,
            last_updated,
        });
    }
    Ok(conversations)
}
