// src/error.rs
//! Typed failures the transport must tell apart. Per-endpoint fetch
//! failures are not here: those stay in-band inside the result bundle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// No verifiable ticker could be extracted from the question.
    #[error("could not detect a valid ticker from the question")]
    Detection,

    /// A completion call errored or returned unusable content.
    #[error("completion request failed: {0}")]
    Oracle(anyhow::Error),

    /// A required request field is missing at the transport boundary.
    #[error("missing required field: {0}")]
    Validation(&'static str),
}
