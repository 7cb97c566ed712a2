use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use super::server::AppState;
use crate::error::InvokeError;

pub const ALLOWED_MODEL_NAMES: [&str; 3] = ["gemini-1.5-pro", "gemini-1.5-flash", "gpt-4o-mini"];
pub const INVALID_MODEL_MESSAGE: &str = "Invalid model name. Kindly select a valid AI model";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub model_name: String,
    pub model_provider: String,
    pub system_prompt: String,
    pub messages: Vec<String>,
    pub allow_search: bool,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("agent task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self, "chat request failed");
        let body = Json(json!({"error": self.to_string()}));
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

pub fn is_allowed_model(model_name: &str) -> bool {
    ALLOWED_MODEL_NAMES.contains(&model_name)
}

/// Multi-turn input collapses into one query; roles and turn boundaries are dropped.
pub fn join_messages(messages: &[String]) -> String {
    messages.join(" ")
}

pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

pub async fn handle_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<Value>, ApiError> {
    if !is_allowed_model(&req.model_name) {
        warn!(model = %req.model_name, "rejected model name");
        return Ok(Json(json!({"error": INVALID_MODEL_MESSAGE})));
    }

    let query = join_messages(&req.messages);
    let invoker = state.invoker.clone();
    let answer = tokio::task::spawn_blocking(move || {
        invoker.invoke(
            &req.model_name,
            &query,
            req.allow_search,
            &req.system_prompt,
            &req.model_provider,
        )
    })
    .await??;

    Ok(Json(answer.map(Value::String).unwrap_or(Value::Null)))
}
