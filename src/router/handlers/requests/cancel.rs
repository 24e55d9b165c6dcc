use axum::extract::{Extension, Path, State};
use axum::Json;
use tracing::instrument;

use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::state::AppState;
use crate::types::PayoutRequest;

#[instrument(skip(state), fields(request_id = %request_id))]
async fn _cancel(
    state: AppState,
    request_id: String,
    context: RequestContext,
) -> Result<PayoutRequest, AppError> {
    state
        .core
        .lifecycle
        .cancel_request(&request_id, Some(context.correlation_id.clone()))
        .await
        .map_err(|e| e.with_context(context))
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(request_id): Path<String>,
) -> Result<Json<PayoutRequest>, AppError> {
    let request = _cancel(state, request_id, context).await?;
    Ok(Json(request))
}
