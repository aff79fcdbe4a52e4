use axum::{
    routing::{get, post},
    Router,
};
use tidings_store::{Presence, Store};
use tower_http::cors::{Any, CorsLayer};

pub mod error;
pub mod middleware;
pub mod routes;

#[derive(Clone)]
pub struct ApiState {
    pub store: Store,
    pub presence: Presence,
    pub jwt_secret: String,
}

pub fn build_router() -> Router<ApiState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/login", post(routes::auth::login))
        .route("/history", get(routes::history::channel_history))
        .route(
            "/channels/{channel_id}/users",
            get(routes::presence::channel_users),
        )
        .route(
            "/conversations",
            get(routes::conversations::list_conversations),
        )
        .route("/conversations/read", post(routes::conversations::mark_read))
        .layer(cors)
}
