use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::observability::sanitize_doctor_id;
use crate::state::AppState;
use crate::types::PayoutRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestRequest {
    pub doctor_id: String,
    /// Amount in currency minor units
    pub amount: u64,
    pub method_id: String,
}

#[instrument(
    skip(state, req),
    fields(
        doctor_id = %sanitize_doctor_id(&req.doctor_id),
        amount = req.amount,
    )
)]
async fn _create(
    state: AppState,
    req: CreateRequestRequest,
    context: RequestContext,
) -> Result<PayoutRequest, AppError> {
    let request = state
        .core
        .lifecycle
        .create_request(
            &req.doctor_id,
            req.amount,
            &req.method_id,
            Some(context.correlation_id.clone()),
        )
        .await
        .map_err(|e| e.with_context(context))?;

    info!(
        request_id = %request.id,
        reference = %request.reference,
        "Payout request accepted"
    );

    Ok(request)
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(req): Json<CreateRequestRequest>,
) -> Result<(StatusCode, Json<PayoutRequest>), AppError> {
    let request = _create(state, req, context).await?;
    Ok((StatusCode::CREATED, Json(request)))
}
