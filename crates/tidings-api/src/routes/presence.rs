use axum::{
    extract::{Path, State},
    Json,
};

use crate::{error::ApiError, middleware::AuthUser, ApiState};

/// User ids currently connected to the channel on any gateway.
pub async fn channel_users(
    State(state): State<ApiState>,
    _user: AuthUser,
    Path(channel_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    let users = state.presence.members(&channel_id).await?;
    Ok(Json(users))
}
