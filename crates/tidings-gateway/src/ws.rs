use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tidings_core::auth;
use tidings_model::Channel;

use crate::hub::HubHandle;
use crate::session;

#[derive(Clone)]
pub struct GatewayState {
    pub hub: HubHandle,
    pub jwt_secret: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    channel: Option<String>,
    token: Option<String>,
}

/// `GET /ws?channel=<id>[&token=<jwt>]`
///
/// The token comes from the Authorization header when the client can set
/// one, otherwise from the query string. Admission checks run before the
/// upgrade so rejections are plain HTTP statuses.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    State(state): State<GatewayState>,
) -> Response {
    let Some(token) = resolve_token(&headers, &query) else {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    };
    let claims = match auth::validate_token(&token, &state.jwt_secret) {
        Ok(claims) => claims,
        Err(_) => return (StatusCode::UNAUTHORIZED, "invalid token").into_response(),
    };

    let channel_id = requested_channel(&query);
    let channel = match Channel::parse(&channel_id) {
        Ok(channel) => channel,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid DM channel format").into_response(),
    };
    if !channel.authorize(&claims.sub) {
        return (StatusCode::FORBIDDEN, "not a participant in this DM").into_response();
    }

    let hub = state.hub.clone();
    ws.max_message_size(session::MAX_FRAME_BYTES)
        .on_upgrade(move |socket| session::run(socket, hub, claims.sub, channel_id))
}

fn resolve_token(headers: &HeaderMap, query: &WsQuery) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| auth::strip_bearer(value).to_string())
        .or_else(|| query.token.clone())
}

fn requested_channel(query: &WsQuery) -> String {
    query
        .channel
        .clone()
        .filter(|channel| !channel.is_empty())
        .unwrap_or_else(|| "general".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_token_wins_over_query_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );
        let query = WsQuery {
            channel: None,
            token: Some("query-token".to_string()),
        };
        assert_eq!(resolve_token(&headers, &query).as_deref(), Some("header-token"));
    }

    #[test]
    fn query_token_is_the_fallback() {
        let query = WsQuery {
            channel: None,
            token: Some("query-token".to_string()),
        };
        assert_eq!(
            resolve_token(&HeaderMap::new(), &query).as_deref(),
            Some("query-token")
        );
        assert!(resolve_token(&HeaderMap::new(), &WsQuery::default()).is_none());
    }

    #[test]
    fn channel_defaults_to_general() {
        assert_eq!(requested_channel(&WsQuery::default()), "general");
        let query = WsQuery {
            channel: Some(String::new()),
            token: None,
        };
        assert_eq!(requested_channel(&query), "general");
        let query = WsQuery {
            channel: Some("random".to_string()),
            token: None,
        };
        assert_eq!(requested_channel(&query), "random");
    }
}
