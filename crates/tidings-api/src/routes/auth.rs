use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tidings_core::auth;

use crate::{error::ApiError, ApiState};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Mint a bearer token for the given user id. Identity is taken on faith
/// here; a production deployment puts a real identity provider behind
/// this endpoint.
pub async fn login(
    State(state): State<ApiState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::BadRequest("user_id is required".to_string()));
    }
    let token = auth::create_token(user_id, &state.jwt_secret)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(LoginResponse { token }))
}
