use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::state::AppState;

#[instrument(skip(state), fields(method_id = %method_id))]
async fn _delete(
    state: AppState,
    method_id: String,
    context: RequestContext,
) -> Result<(), AppError> {
    state
        .core
        .registry
        .delete_method(&method_id, Some(context.correlation_id.clone()))
        .await
        .map_err(|e| e.with_context(context))
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(method_id): Path<String>,
) -> Result<StatusCode, AppError> {
    _delete(state, method_id, context).await?;
    Ok(StatusCode::NO_CONTENT)
}
