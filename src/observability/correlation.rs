use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

pub const CORRELATION_ID_HEADER: &str = "X-Correlation-Id";
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

const MAX_CORRELATION_ID_LENGTH: usize = 200;

/// Per-request identity used to tie log lines, events, and error payloads
/// together. The correlation id may span several requests (supplied by the
/// caller); the request id is always freshly generated.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub correlation_id: String,
    pub request_id: String,
}

impl RequestContext {
    pub fn new(correlation_id: Option<String>) -> Self {
        Self {
            correlation_id: correlation_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Validate a caller-supplied correlation ID. Malformed values are dropped
/// and replaced rather than rejected, so a bad header never fails a request.
fn validate_correlation_id(correlation_id: &str) -> Result<(), &'static str> {
    if correlation_id.is_empty() {
        return Err("Correlation ID cannot be empty");
    }

    if correlation_id.len() > MAX_CORRELATION_ID_LENGTH {
        return Err("Correlation ID exceeds maximum length");
    }

    if !correlation_id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Correlation ID contains invalid characters");
    }

    Ok(())
}

/// Middleware that assigns every request a `RequestContext`, propagates it
/// as an extension, echoes the ids back as response headers, and wraps the
/// handler in a span carrying both ids.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let correlation_id = match supplied {
        Some(id) => match validate_correlation_id(&id) {
            Ok(()) => Some(id),
            Err(reason) => {
                warn!(reason = %reason, "Dropping invalid correlation ID header");
                None
            }
        },
        None => None,
    };

    let context = RequestContext::new(correlation_id);
    let span = info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        correlation_id = %context.correlation_id,
        request_id = %context.request_id,
    );

    request.extensions_mut().insert(context.clone());

    let mut response = next.run(request).instrument(span).await;

    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&context.correlation_id) {
        headers.insert(CORRELATION_ID_HEADER, value);
    }
    if let Ok(value) = HeaderValue::from_str(&context.request_id) {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    response
}
