//! # AppError
//!
//! Centralized error handling for the Captionary ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all cap-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad upload input (empty payload, disallowed type, oversize).
    /// Surfaced to the caller immediately; no record is created.
    #[error("validation error: {0}")]
    Validation(String),

    /// Lookup or delete of a nonexistent resource.
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Infrastructure failure (e.g., record store down). Unlike a
    /// describer failure, this propagates unmasked.
    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Failure of a single external describer invocation. Consumed by the
/// pipeline, which records a summary on the image instead of failing
/// the operation; never crosses the API boundary.
#[derive(Error, Debug)]
pub enum DescriberError {
    /// Network-level failure reaching the external endpoint.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Endpoint reachable but returned a non-success status.
    #[error("describer returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Response body did not carry the expected candidate structure.
    #[error("malformed describer response: {0}")]
    Malformed(String),

    /// Structurally valid response with no usable candidate text.
    #[error("describer returned no description")]
    EmptyDescription,
}

/// A specialized Result type for Captionary logic.
pub type Result<T> = std::result::Result<T, AppError>;
