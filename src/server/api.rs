use crate::error::ErrorCode;
use crate::gateway::Gateway;
use crate::models::chat::{ ChatRequest, ChatResponse, ClearHistoryRequest, ClearHistoryResponse };
use std::sync::Arc;
use axum::{
    routing::{ delete, get, post },
    Router,
    Json,
    extract::{ rejection::{ JsonRejection, QueryRejection }, Query, Request, State },
    http::{ header::AUTHORIZATION, StatusCode },
    middleware::{ self, Next },
    response::{ IntoResponse, Response },
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{ Any, CorsLayer };
use log::{ error, warn };

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    code: ErrorCode,
    error: String,
}

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub api_keys: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, api_keys: Vec<String>) -> Self {
        let api_keys = api_keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        Self {
            gateway,
            api_keys: Arc::new(api_keys),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let protected = Router::new()
        .route("/api/ai", post(chat_handler))
        .route("/api/ai/clear", delete(clear_history_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::ValidationError | ErrorCode::UnsupportedModel | ErrorCode::InvalidJson => {
            StatusCode::BAD_REQUEST
        }
        ErrorCode::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCode::ProviderTransport | ErrorCode::ProviderResponse => StatusCode::BAD_GATEWAY,
        ErrorCode::MissingAuth | ErrorCode::InvalidAuthFormat | ErrorCode::InvalidApiKey => {
            StatusCode::UNAUTHORIZED
        }
    }
}

fn error_response(code: ErrorCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        success: false,
        code,
        error: format!("{}: {}", code, message.into()),
    };
    (status_for(code), Json(body)).into_response()
}

/// Every protected request needs a configured key. An empty key list rejects all.
async fn require_api_key(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let header = match req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if !value.is_empty() => value,
        _ => {
            return error_response(ErrorCode::MissingAuth, "Authorization header required");
        }
    };
    let key = match header.split_once(' ') {
        Some(("Bearer", key)) if !key.is_empty() && !key.contains(' ') => key,
        _ => {
            return error_response(ErrorCode::InvalidAuthFormat, "Invalid authorization format");
        }
    };
    if !state.api_keys.iter().any(|valid| valid == key) {
        warn!("Rejected request with unknown API key");
        return error_response(ErrorCode::InvalidApiKey, "Invalid API key");
    }

    next.run(req).await
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoint": "POST /api/ai",
        "models": state.gateway.models().ids(),
    }))
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Response {
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(e) => {
            return error_response(ErrorCode::InvalidJson, format!("Invalid JSON format: {}", e.body_text()));
        }
    };

    let model = request.model.clone();
    match state.gateway.dispatch(request).await {
        Ok(resp) => {
            let status = resp.code.map(status_for).unwrap_or(StatusCode::OK);
            if let Some(err) = &resp.error {
                error!("Model '{}' failed: {}", model, err);
            }
            (status, Json(resp)).into_response()
        }
        Err(e) => {
            let code = e.code();
            (status_for(code), Json(ChatResponse::failure(model, code, e.to_string()))).into_response()
        }
    }
}

async fn clear_history_handler(
    State(state): State<AppState>,
    query: Result<Query<ClearHistoryRequest>, QueryRejection>
) -> Response {
    let Query(req) = match query {
        Ok(query) => query,
        Err(e) => {
            return error_response(ErrorCode::ValidationError, e.body_text());
        }
    };

    match state.gateway.clear_history(&req.chat_id, &req.sender_id) {
        Ok(()) =>
            Json(ClearHistoryResponse {
                success: true,
                message: "Conversation history cleared".to_string(),
            }).into_response(),
        Err(e) => error_response(e.code(), e.to_string()),
    }
}
