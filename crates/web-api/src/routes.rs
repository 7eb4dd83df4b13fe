use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{error::ApiError, state::AppState, ws_connection};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    /// 承载凭证，由身份网关验证
    token: String,
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // 身份验证失败的连接在任何登记表变更之前被拒绝
    let identity = state
        .identity_verifier
        .verify(&query.token)
        .map_err(|err| {
            tracing::warn!(error = %err, "websocket upgrade rejected");
            ApiError::unauthorized("invalid credential")
        })?;

    tracing::info!(user_id = %identity.user_id, "websocket upgrade accepted");
    Ok(ws.on_upgrade(move |socket| ws_connection::run(socket, state, identity)))
}
