use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tidings_store::messages::{self, StoredMessage};

use crate::{error::ApiError, middleware::AuthUser, ApiState};

/// History partitions are unbounded; reads are capped.
const HISTORY_LIMIT: i32 = 200;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub channel_id: Option<String>,
}

/// Most-recent-first messages for one channel.
pub async fn channel_history(
    State(state): State<ApiState>,
    _user: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StoredMessage>>, ApiError> {
    let channel_id = query
        .channel_id
        .filter(|channel| !channel.is_empty())
        .unwrap_or_else(|| "general".to_string());
    let messages = messages::channel_history(&state.store, &channel_id, HISTORY_LIMIT).await?;
    Ok(Json(messages))
}
