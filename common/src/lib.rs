//! Shared primitives for the notification workspace.
//!
//! Kept dependency-light so every crate (the pipeline library and the host
//! binary) can use the same error location and credential types.

pub mod error;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
