//! # Validation Errors
//!
//! Construction-time failures for the domain primitives in this crate.
//! Each variant carries the rejected input so operators can diagnose
//! misconfiguration without guesswork.

use thiserror::Error;

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Address is not a 20-byte hex account address.
    #[error("invalid address: \"{0}\" (expected 0x followed by 40 hex digits)")]
    InvalidAddress(String),

    /// Evidence reference is empty, too long, or contains whitespace.
    #[error("invalid evidence reference: \"{0}\"")]
    InvalidEvidenceRef(String),

    /// Timestamp could not be parsed or is out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Amount string is not a non-negative decimal integer.
    #[error("invalid amount: \"{0}\" (expected a non-negative decimal integer)")]
    InvalidAmount(String),

    /// Verification confidence outside the closed unit interval.
    #[error("confidence {0} must be within [0.0, 1.0]")]
    InvalidConfidence(f64),
}
