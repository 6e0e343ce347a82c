//! Core data model, environment/config plumbing, and the shared error
//! taxonomy for the AI request gateway.
//!
//! This crate has no knowledge of resilience, caching, or HTTP; it only
//! defines the types those crates and the request pipeline agree on.

mod config;
mod env;
mod error;
mod operation;
mod request;
mod response;

pub use config::{merge_json_objects, AuthMode, GatewaySettings};
pub use env::{Environment, FeatureContext};
pub use error::{ConfigurationError, ErrorBody, ErrorContext, ErrorDetail, GatewayError};
pub use operation::{Operation, UnknownOperation};
pub use request::{
    BatchTextProcessingRequest, BatchValidationError, RequestValidationError,
    TextProcessingRequest, BATCH_MAX_LEN, BATCH_MIN_LEN, TEXT_MAX_LEN, TEXT_MIN_LEN,
};
pub use response::{
    BatchItem, BatchItemStatus, BatchTextProcessingResponse, ResultPayload, Sentiment,
    SentimentResult, TextProcessingResponse,
};
