//! Core domain errors.

use thiserror::Error;

/// Core domain errors for ScanRun.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// Run not found.
    #[error("Run not found: {0}")]
    RunNotFound(String),

    /// Results requested before the run reached `done`.
    #[error("Results not ready for run: {0}")]
    ResultsNotReady(String),

    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
