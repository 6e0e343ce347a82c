//! API key authentication, prompt-injection input sanitization, and
//! response validation. See SPEC_FULL.md §4.5, §4.6, §4.7.

mod auth;
mod error;
mod sanitize;
mod validate;

pub use auth::{extract_credential, truncated_prefix, AuthGate, KeyMetadata, Principal};
pub use error::{AuthError, ResponseValidationError};
pub use sanitize::{
    sanitize_option_string, sanitize_text, sanitize_text_default, DEFAULT_INPUT_MAX_LENGTH,
};
pub use validate::validate_response;
