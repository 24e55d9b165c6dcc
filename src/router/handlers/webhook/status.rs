use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::{instrument, warn};

use crate::auth::{WebhookAuth, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use crate::core::StatusUpdate;
use crate::error::AppError;
use crate::observability::correlation::RequestContext;
use crate::state::AppState;
use crate::types::PayoutRequest;

/// Check the rail's HMAC over `"{timestamp}{body}"` before touching the
/// payload. Signature failures never reveal whether the request exists.
fn verify_signature(auth: &WebhookAuth, headers: &HeaderMap, body: &str) -> Result<(), AppError> {
    if !auth.is_enabled() {
        return Ok(());
    }

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::authentication_error("missing webhook signature header"))?;
    let timestamp = headers
        .get(TIMESTAMP_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|t| t.parse::<i64>().ok())
        .ok_or_else(|| AppError::authentication_error("missing or malformed webhook timestamp header"))?;

    if !auth.verify_signature(body, timestamp, signature) {
        warn!("Webhook delivery rejected - signature mismatch");
        return Err(AppError::authentication_error(
            "webhook signature verification failed",
        ));
    }

    Ok(())
}

#[instrument(skip(state, body))]
async fn _status(
    state: AppState,
    body: String,
    context: RequestContext,
) -> Result<PayoutRequest, AppError> {
    let update: StatusUpdate = serde_json::from_str(&body)
        .map_err(|e| AppError::validation_error(format!("invalid status update: {}", e)))?;

    state
        .core
        .ingester
        .apply_status_update(&update, Some(context.correlation_id.clone()))
        .await
        .map_err(|e| e.with_context(context))
}

#[axum_macros::debug_handler]
pub async fn handle_rest(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Extension(auth): Extension<Arc<WebhookAuth>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<PayoutRequest>, AppError> {
    verify_signature(&auth, &headers, &body).map_err(|e| e.with_context(context.clone()))?;
    let request = _status(state, body, context).await?;
    Ok(Json(request))
}
