//! candor library interface
//!
//! Exposes the analysis pipeline and HTTP surface for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, Error, Result};

use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::config::AnalysisParams;
use crate::models::InterviewScript;
use crate::services::{Classifier, InterviewSession};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Active sessions, keyed by session id. Each session is owned by its
    /// socket loop; REST handlers take the same lock, so manual overrides
    /// serialize with chunk processing.
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<InterviewSession>>>>>,
    /// Shared classifier used by all sessions
    pub classifier: Arc<dyn Classifier>,
    /// The fixed interview outline
    pub script: Arc<InterviewScript>,
    /// Analysis tuning parameters
    pub params: AnalysisParams,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        script: Arc<InterviewScript>,
        params: AnalysisParams,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            classifier,
            script,
            params,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(api::session_socket))
        .merge(api::session_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
