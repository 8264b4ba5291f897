//! Differential testing of the native hash against the emitted contract.
//!
//! The same inputs go through [`NativeHashRunner`] (the library) and
//! [`BytecodeHashRunner`] (the emitted creation code, deployed and called in
//! the built-in interpreter). Outputs are compared as canonical decimal
//! strings; any divergence yields a [`ReproBundle`].

pub mod corpus;
mod harness;
mod report;
mod repro;
mod runner;

pub use corpus::{Corpus, Expected, TestVector};
pub use harness::{DiffResult, DiffTestHarness};
pub use report::{Report, Verdict};
pub use repro::ReproBundle;
pub use runner::{BytecodeHashRunner, HashOutput, HashRunner, NativeHashRunner};

use crate::error::ErrorCode;
use crate::evm::VmError;
use thiserror::Error;

/// Result type for conformance operations.
pub type ConformanceResult<T> = Result<T, ConformanceError>;

/// Errors that can occur during conformance testing.
#[derive(Debug, Error)]
pub enum ConformanceError {
    /// Library error outside the compared operation, e.g. emission failed.
    #[error("library error: {0}")]
    Library(#[from] ErrorCode),
    /// Interpreter fault.
    #[error("interpreter fault: {0}")]
    Vm(#[from] VmError),
    /// The contract returned something that is not a field element word.
    #[error("unexpected contract output: {0}")]
    UnexpectedOutput(String),
    /// Corpus could not be read or parsed.
    #[error("corpus error: {0}")]
    Corpus(String),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
