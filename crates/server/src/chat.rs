use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{Method, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use storechat_agent::ChatOrchestrator;
use storechat_core::domain::chat::{ChatRequest, ChatResponse};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::health;

#[derive(Clone)]
pub struct ChatState {
    orchestrator: Arc<ChatOrchestrator>,
}

/// Full public surface: landing page, chat endpoint and health, all behind a permissive CORS
/// policy so the widget can be embedded on any storefront domain.
pub fn app_router(orchestrator: Arc<ChatOrchestrator>) -> Router {
    let orders = orchestrator.orders().clone();
    router(orchestrator).merge(health::router(orders)).layer(cors())
}

pub fn router(orchestrator: Arc<ChatOrchestrator>) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/api/chat", post(chat).options(preflight))
        .with_state(ChatState { orchestrator })
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

pub async fn chat(
    State(state): State<ChatState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatResponse> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(
                event_name = "server.chat.malformed_body",
                correlation_id = "unknown",
                error = %rejection,
                "chat body could not be parsed; treating as empty message"
            );
            ChatRequest::default()
        }
    };

    Json(state.orchestrator.handle(&request).await)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn landing_page() -> Html<&'static str> {
    Html(
        "<!doctype html>\
         <html lang=\"ar\" dir=\"rtl\">\
         <head><meta charset=\"utf-8\"><title>storechat</title></head>\
         <body>\
         <h1>storechat is running</h1>\
         <p>POST <code>/api/chat</code> with <code>{\"message\": \"...\"}</code></p>\
         </body>\
         </html>",
    )
}
