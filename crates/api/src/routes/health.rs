//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use event_store::EventStore;
use serde::Serialize;

use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Activities the saga runtime can invoke.
    pub activities: Vec<&'static str>,
}

/// GET /health
pub async fn check<S: EventStore + 'static>(State(state): State<Arc<AppState<S>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        activities: state.runtime.saga().activities().names(),
    })
}
