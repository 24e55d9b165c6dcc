use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::observability::sanitize_doctor_id;
use crate::state::AppState;
use crate::types::{PayoutMethod, Provider};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMethodRequest {
    pub doctor_id: String,
    pub provider: Provider,
    pub number: String,
    #[serde(default)]
    pub is_default: bool,
}

#[instrument(
    skip(state, req),
    fields(
        doctor_id = %sanitize_doctor_id(&req.doctor_id),
        provider = %req.provider,
    )
)]
async fn _add(
    state: AppState,
    req: AddMethodRequest,
    context: RequestContext,
) -> Result<PayoutMethod, AppError> {
    state
        .core
        .registry
        .add_method(
            &req.doctor_id,
            req.provider,
            &req.number,
            req.is_default,
            Some(context.correlation_id.clone()),
        )
        .await
        .map_err(|e| e.with_context(context))
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(req): Json<AddMethodRequest>,
) -> Result<(StatusCode, Json<PayoutMethod>), AppError> {
    let method = _add(state, req, context).await?;
    Ok((StatusCode::CREATED, Json(method)))
}
