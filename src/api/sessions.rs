//! Session REST endpoints: reports and manual script override

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::services::report::ScriptSummary;
use crate::AppState;

/// GET /sessions - active session ids
pub async fn list_sessions(State(state): State<AppState>) -> Json<Vec<Uuid>> {
    let sessions = state.sessions.read().await;
    Json(sessions.keys().copied().collect())
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// "json" (default) or "markdown"
    pub format: Option<String>,
}

/// GET /sessions/:id/report - point-in-time session summary
pub async fn session_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Response> {
    let session = lookup(&state, id).await?;
    let report = session.lock().await.report();

    match query.format.as_deref() {
        Some("markdown") => Ok((
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            report.to_markdown(),
        )
            .into_response()),
        None | Some("json") => Ok(Json(report).into_response()),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Unknown report format: {}",
            other
        ))),
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    /// Subsection id in "N.M" form
    pub subsection: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub subsection: String,
    pub script: ScriptSummary,
}

/// POST /sessions/:id/script/complete - manually mark a subsection
/// complete, bypassing classifier confidence gating. One-way latch
/// semantics still hold.
pub async fn complete_subsection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CompleteRequest>,
) -> ApiResult<Json<CompleteResponse>> {
    let session = lookup(&state, id).await?;
    let mut session = session.lock().await;
    session.mark_subsection_complete(&request.subsection)?;

    Ok(Json(CompleteResponse {
        subsection: request.subsection,
        script: session.report().script,
    }))
}

async fn lookup(
    state: &AppState,
    id: Uuid,
) -> ApiResult<std::sync::Arc<tokio::sync::Mutex<crate::services::InterviewSession>>> {
    state
        .sessions
        .read()
        .await
        .get(&id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/:id/report", get(session_report))
        .route("/sessions/:id/script/complete", post(complete_subsection))
}
