use axum::extract::{Extension, Path, State};
use axum::Json;
use tracing::instrument;

use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::observability::sanitize_doctor_id;
use crate::state::AppState;
use crate::types::PayoutStats;

#[instrument(skip(state), fields(doctor_id = %sanitize_doctor_id(&doctor_id)))]
async fn _stats(
    state: AppState,
    doctor_id: String,
    _context: RequestContext,
) -> Result<PayoutStats, AppError> {
    Ok(state.core.stats.compute_stats(&doctor_id).await)
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(doctor_id): Path<String>,
) -> Result<Json<PayoutStats>, AppError> {
    let stats = _stats(state, doctor_id, context).await?;
    Ok(Json(stats))
}
