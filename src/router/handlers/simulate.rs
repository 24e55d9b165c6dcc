use axum::extract::{Extension, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::state::AppState;
use crate::types::{PayoutRequest, PayoutStatus};

/// Drives the worker-side settlement transitions by hand, standing in for a
/// live payment rail during development and demos.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateProcessRequest {
    pub request_id: String,
    pub new_status: PayoutStatus,
    pub failure_reason: Option<String>,
}

#[instrument(
    skip(state, req),
    fields(request_id = %req.request_id, new_status = %req.new_status)
)]
async fn _process(
    state: AppState,
    req: SimulateProcessRequest,
    context: RequestContext,
) -> Result<PayoutRequest, AppError> {
    state
        .core
        .lifecycle
        .advance(
            &req.request_id,
            req.new_status,
            req.failure_reason,
            Some(context.correlation_id.clone()),
        )
        .await
        .map_err(|e| e.with_context(context))
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(req): Json<SimulateProcessRequest>,
) -> Result<Json<PayoutRequest>, AppError> {
    let request = _process(state, req, context).await?;
    Ok(Json(request))
}
