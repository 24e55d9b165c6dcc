pub mod basic;
pub mod hmac;

pub use basic::{basic_auth_middleware, BasicAuth};
pub use hmac::{WebhookAuth, SIGNATURE_HEADER, TIMESTAMP_HEADER};
