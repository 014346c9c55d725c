use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::server::AppState;
use crate::runner::RunStatus;

#[derive(Debug, Deserialize)]
pub struct AnalysisRequest {
    pub request: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub max_turns: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub request_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "murmuration",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Runs one request through the agent pipeline. Every failure mode
/// (engine fault, contract violation, exhausted turn budget) comes back as
/// a structured `failed` response; the serving process never aborts on a
/// bad run.
pub async fn create_analysis(
    State(state): State<AppState>,
    Json(request): Json<AnalysisRequest>,
) -> Json<AnalysisResponse> {
    let session_id = request
        .session_id
        .unwrap_or_else(|| format!("session_{}", uuid::Uuid::new_v4()));
    let max_turns = request.max_turns.unwrap_or(state.config.max_turns);

    let pipeline = state.pipeline.get_or_build();
    let outcome = state
        .runner
        .run(&pipeline, &session_id, &request.request, max_turns)
        .await;

    log::info!(
        "run {} finished: {:?} after {} turns",
        session_id,
        outcome.status,
        outcome.trace.len()
    );

    let response = match outcome.status {
        RunStatus::Completed => AnalysisResponse {
            request_id: session_id,
            status: "completed".to_string(),
            result: outcome.output,
            error: None,
        },
        RunStatus::Failed | RunStatus::TurnBudgetExceeded => AnalysisResponse {
            request_id: session_id,
            status: "failed".to_string(),
            result: None,
            error: outcome.error.map(|e| e.to_string()),
        },
    };

    Json(response)
}
