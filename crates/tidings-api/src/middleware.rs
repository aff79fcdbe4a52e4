use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, StatusCode},
};
use tidings_core::auth;

use crate::ApiState;

/// Extractor for bearer-authenticated requests.
pub struct AuthUser {
    pub user_id: String,
}

impl FromRequestParts<ApiState> for AuthUser {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization header"))?;

        let token = auth::strip_bearer(auth_header);

        let claims = auth::validate_token(token, &state.jwt_secret)
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
