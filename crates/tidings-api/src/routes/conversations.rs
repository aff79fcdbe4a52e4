use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tidings_store::{conversations, counters};

use crate::{error::ApiError, middleware::AuthUser, ApiState};

#[derive(Debug, Serialize)]
pub struct ConversationView {
    pub user_id: String,
    pub other_user_id: String,
    pub last_updated: DateTime<Utc>,
    pub unread_count: i64,
}

/// The caller's DM peers, annotated with unread counts. An absent counter
/// row reads as zero.
pub async fn list_conversations(
    State(state): State<ApiState>,
    user: AuthUser,
) -> Result<Json<Vec<ConversationView>>, ApiError> {
    let rows = conversations::list(&state.store, &user.user_id).await?;
    let mut view = Vec::with_capacity(rows.len());
    for row in rows {
        let unread_count =
            counters::unread_count(&state.store, &row.user_id, &row.other_user_id).await?;
        view.push(ConversationView {
            user_id: row.user_id,
            other_user_id: row.other_user_id,
            last_updated: row.last_updated,
            unread_count,
        });
    }
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct ReadReceiptRequest {
    pub other_user_id: String,
}

/// Reset the caller's unread counter for one peer by deleting the row.
pub async fn mark_read(
    State(state): State<ApiState>,
    user: AuthUser,
    Json(request): Json<ReadReceiptRequest>,
) -> Result<StatusCode, ApiError> {
    let other_user_id = request.other_user_id.trim();
    if other_user_id.is_empty() {
        return Err(ApiError::BadRequest("other_user_id is required".to_string()));
    }
    counters::reset(&state.store, &user.user_id, other_user_id).await?;
    Ok(StatusCode::OK)
}
