use axum::extract::{Extension, Path, State};
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::observability::sanitize_doctor_id;
use crate::state::AppState;
use crate::types::PayoutMethod;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDefaultRequest {
    pub doctor_id: String,
}

#[instrument(
    skip(state, req),
    fields(
        doctor_id = %sanitize_doctor_id(&req.doctor_id),
        method_id = %method_id,
    )
)]
async fn _set_default(
    state: AppState,
    method_id: String,
    req: SetDefaultRequest,
    context: RequestContext,
) -> Result<PayoutMethod, AppError> {
    state
        .core
        .registry
        .set_default(
            &req.doctor_id,
            &method_id,
            Some(context.correlation_id.clone()),
        )
        .await
        .map_err(|e| e.with_context(context))
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(method_id): Path<String>,
    Json(req): Json<SetDefaultRequest>,
) -> Result<Json<PayoutMethod>, AppError> {
    let method = _set_default(state, method_id, req, context).await?;
    Ok(Json(method))
}
