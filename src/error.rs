//! Error classification shared by service and route layers.
//!
//! Every domain error enum implements [`ErrorCode`] so HTTP handlers can emit
//! a stable machine-readable code next to the human message.

/// Stable error code + retry hint for an error value.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
