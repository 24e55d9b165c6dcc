use std::sync::Arc;

use axum::extract::Extension;
use axum::http::Method;
use axum::middleware;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{basic_auth_middleware, BasicAuth, WebhookAuth};
use crate::health::{health_check, liveness_check, readiness_check};
use crate::observability::request_id_middleware;
use crate::state::AppState;

pub mod handlers;

/// Client-facing routes:
/// - `GET /requests/:id`: List payout requests for a doctor.
/// - `POST /requests`: Create a payout request against a registered method.
/// - `PATCH /requests/:id/cancel`: Cancel a pending request.
/// - `PATCH /requests/:id/retry`: Put a failed request back in the queue.
/// - `GET /methods/:id`: List a doctor's payout methods.
/// - `POST /methods`: Register a mobile-money payout method.
/// - `PATCH /methods/:id/default`: Make a method the doctor's default.
/// - `DELETE /methods/:id`: Remove a payout method.
/// - `GET /stats/:id`: Aggregate payout totals for a doctor.
/// - `POST /simulate/process`: Drive the worker-path settlement transitions.
fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(handlers::requests::create::handle_rest))
        .route("/requests/:id", get(handlers::requests::list::handle_rest))
        .route(
            "/requests/:id/cancel",
            patch(handlers::requests::cancel::handle_rest),
        )
        .route(
            "/requests/:id/retry",
            patch(handlers::requests::retry::handle_rest),
        )
        .route("/methods", post(handlers::methods::add::handle_rest))
        .route(
            "/methods/:id",
            get(handlers::methods::list::handle_rest)
                .delete(handlers::methods::delete::handle_rest),
        )
        .route(
            "/methods/:id/default",
            patch(handlers::methods::set_default::handle_rest),
        )
        .route("/stats/:id", get(handlers::stats::handle_rest))
        .route(
            "/simulate/process",
            post(handlers::simulate::handle_rest),
        )
}

/// Assemble the full application router. Client routes sit behind HTTP Basic
/// auth (when enabled); the webhook route authenticates with the rail's HMAC
/// signature instead, since the rail does not hold the api password.
pub fn build_router(
    state: AppState,
    basic_auth: Arc<BasicAuth>,
    webhook_auth: Arc<WebhookAuth>,
) -> Router {
    let client = client_routes().with_state(state.clone());
    let client = if basic_auth.is_enabled() {
        let auth = basic_auth.clone();
        client.route_layer(middleware::from_fn(move |request, next| {
            basic_auth_middleware(auth.clone(), request, next)
        }))
    } else {
        client
    };

    let webhook = Router::new()
        .route(
            "/webhook/status",
            post(handlers::webhook::status::handle_rest),
        )
        .with_state(state.clone())
        .layer(Extension(webhook_auth));

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .merge(client)
        .merge(webhook)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check))
        .route("/health/ready", get(readiness_check))
        .layer(Extension(Arc::new(state)))
}
