//! Error types for the reader bridge

use thiserror::Error;

use crate::bridge::events::EventError;
use crate::bridge::types::CommandError;
use crate::instant::{DocumentError, IdentityError, ValidationError};
use crate::resource::ResourceError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
