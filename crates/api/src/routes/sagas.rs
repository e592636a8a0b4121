//! Saga execution metadata endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use event_store::EventStore;
use saga::{SagaExecutionInfo, SagaInstanceId};
use serde::Serialize;

use crate::error::ApiError;
use crate::routes::orders::AppState;

#[derive(Serialize)]
pub struct SagaStatusResponse {
    pub saga_id: String,
    pub order_id: String,
    pub state: String,
    pub order_status: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

impl From<SagaExecutionInfo> for SagaStatusResponse {
    fn from(info: SagaExecutionInfo) -> Self {
        Self {
            saga_id: info.saga_id.to_string(),
            order_id: info.order_id.to_string(),
            state: info.state.to_string(),
            order_status: info.order_status.map(|status| status.to_string()),
            started_at: info.started_at,
            closed_at: info.closed_at,
            failure_reason: info.failure_reason,
        }
    }
}

/// GET /api/sagas/{saga_id}/status: execution metadata from the journal.
#[tracing::instrument(skip(state))]
pub async fn status<S: EventStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(saga_id): Path<String>,
) -> Result<Json<SagaStatusResponse>, ApiError> {
    let saga_id: SagaInstanceId = saga_id.parse()?;
    let info = state
        .runtime
        .describe(saga_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Saga not found: {saga_id}")))?;

    Ok(Json(SagaStatusResponse::from(info)))
}
