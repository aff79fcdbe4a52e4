use scylla::frame::value::Counter;

use crate::{decode_err, Store, StoreError};

/// Bump the unread counter for `(recipient, sender)`. At-least-once
/// broker delivery can inflate the count; accepted.
pub async fn increment(store: &Store, recipient: &str, sender: &str) -> Result<(), StoreError> {
    store
        .session()
        .query_unpaged(
            "UPDATE conversation_counters SET unread_count = unread_count + 1 \
             WHERE user_id = ? AND other_user_id = ?",
            (recipient, sender),
        )
        .await?;
    Ok(())
}

/// An absent row reads as zero.
pub async fn unread_count(
    store: &Store,
    user_id: &str,
    other_user_id: &str,
) -> Result<i64, StoreError> {
    let result = store
        .session()
        .query_unpaged(
            "SELECT unread_count FROM conversation_counters \
             WHERE user_id = ? AND other_user_id = ?",
            (user_id, other_user_id),
        )
        .await?;
    let row = result
        .into_rows_result()
        .map_err(decode_err)?
        .maybe_first_row::<(Counter,)>()
        .map_err(decode_err)?;
    Ok(row.map(|(Counter(count),)| count).unwrap_or(0))
}

/// Counter columns cannot be set to zero; deleting the row is the only
/// supported reset.
pub async fn reset(store: &Store, user_id: &str, other_user_id: &str) -> Result<(), StoreError> {
    store
        .session()
        .query_unpaged(
            "DELETE FROM conversation_counters WHERE user_id = ? AND other_user_id = ?",
            (user_id, other_user_id),
        )
        .await?;
    Ok(())
}
