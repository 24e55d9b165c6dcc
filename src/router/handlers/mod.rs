pub mod methods;
pub mod requests;
pub mod simulate;
pub mod stats;
pub mod webhook;
