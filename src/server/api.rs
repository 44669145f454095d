use axum::{
    body::{ Body, Bytes },
    extract::{ rejection::BytesRejection, DefaultBodyLimit, State },
    http::{ header, StatusCode },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use log::{ info, warn, error };
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::{ Any, CorsLayer };
use uuid::Uuid;

use crate::error::RelayError;
use crate::relay::Relay;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Clone)]
struct AppState {
    relay: Relay,
    max_body_bytes: usize,
}

pub fn router(relay: Relay, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .layer(ServiceBuilder::new().layer(cors).layer(DefaultBodyLimit::max(max_body_bytes)))
        .with_state(AppState { relay, max_body_bytes })
}

async fn chat_handler(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>
) -> Response {
    let request_id = Uuid::new_v4().to_string();

    let opened = match body {
        Ok(body) => state.relay.open(&request_id, &body).await,
        Err(rejection) => Err(body_error(rejection, state.max_body_bytes)),
    };

    match opened {
        Ok(chunks) => {
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                Body::from_stream(chunks),
            ).into_response()
        }
        Err(e) => {
            if e.is_caller_error() {
                info!("[{}] Rejected request: {}", request_id, e);
            } else if e.status_code() == StatusCode::GATEWAY_TIMEOUT {
                warn!("[{}] {}", request_id, e);
            } else {
                error!("[{}] {}", request_id, e);
            }
            e.into_response()
        }
    }
}

fn body_error(rejection: BytesRejection, limit: usize) -> RelayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::BodyTooLarge { limit }
    } else {
        RelayError::MalformedRequest(rejection.body_text())
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
