//! Error codes for field, parameter, hashing and emission failures.
//!
//! Every variant carries a stable numeric code so that CLI output and
//! conformance reports stay comparable across releases.

use thiserror::Error;

/// All error codes surfaced by the library.
///
/// None of these are retried internally: each is a deterministic function
/// of its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    /// A value does not lie in the canonical range [0, p) or could not be
    /// parsed as a field element at all (code 100).
    #[error("invalid field element: {0}")]
    InvalidFieldElement(String),

    /// No parameter table exists for the requested pair (code 200).
    #[error("unsupported configuration: width {width}, security level {security_level}")]
    UnsupportedConfiguration {
        /// Requested state width.
        width: usize,
        /// Requested security level in bits.
        security_level: u32,
    },

    /// A parameter set failed validation (code 201).
    #[error("malformed parameters: {0}")]
    MalformedParameters(String),

    /// More inputs than the absorbing rate allows (code 300).
    #[error("input too large: got {got} elements, limit is {limit}")]
    InputTooLarge {
        /// Number of elements supplied.
        got: usize,
        /// Maximum accepted by the configuration.
        limit: usize,
    },

    /// The configuration has no matching emission template (code 400).
    #[error("emitter config mismatch: {0}")]
    EmitterConfigMismatch(String),
}

impl ErrorCode {
    /// Get the numeric error code.
    pub fn code(&self) -> u32 {
        match self {
            ErrorCode::InvalidFieldElement(_) => 100,
            ErrorCode::UnsupportedConfiguration { .. } => 200,
            ErrorCode::MalformedParameters(_) => 201,
            ErrorCode::InputTooLarge { .. } => 300,
            ErrorCode::EmitterConfigMismatch(_) => 400,
        }
    }

    /// Get the error name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorCode::InvalidFieldElement(_) => "InvalidFieldElement",
            ErrorCode::UnsupportedConfiguration { .. } => "UnsupportedConfiguration",
            ErrorCode::MalformedParameters(_) => "MalformedParameters",
            ErrorCode::InputTooLarge { .. } => "InputTooLarge",
            ErrorCode::EmitterConfigMismatch(_) => "EmitterConfigMismatch",
        }
    }

    /// Whether the caller can reasonably recover by changing its input.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorCode::InputTooLarge { .. })
    }
}

/// Result type for library operations.
pub type PoseidonResult<T> = Result<T, ErrorCode>;
