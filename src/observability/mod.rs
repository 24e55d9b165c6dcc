pub mod correlation;
pub mod logging;
pub mod sanitization;

pub use correlation::{
    request_id_middleware, RequestContext, CORRELATION_ID_HEADER, REQUEST_ID_HEADER,
};
pub use logging::{init_logging, LoggingConfig};
pub use sanitization::{sanitize_doctor_id, sanitize_msisdn};
