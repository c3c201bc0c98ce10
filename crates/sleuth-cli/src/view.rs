//! Caller-side view state: idle → loading → result | error.

use sleuth_core::DiagnosisResult;
use sleuth_diagnose::DiagnoseError;

const UNEXPECTED_ERROR: &str = "An unexpected error occurred while analyzing the bug.";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum View {
    #[default]
    Idle,
    Loading,
    Result(DiagnosisResult),
    Error(String),
}

/// A request is already outstanding; re-submission is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("an analysis is already in progress")]
pub struct AlreadyLoading;

impl View {
    /// Start a request. Clears any previous result or error.
    pub fn submit(&mut self) -> Result<(), AlreadyLoading> {
        if self.is_loading() {
            return Err(AlreadyLoading);
        }
        *self = View::Loading;
        Ok(())
    }

    /// Settle the outstanding request. Returns `false` (and changes nothing)
    /// when no request is outstanding.
    pub fn resolve(&mut self, outcome: Result<DiagnosisResult, DiagnoseError>) -> bool {
        if !self.is_loading() {
            return false;
        }
        *self = match outcome {
            Ok(result) => View::Result(result),
            Err(e) => {
                let message = e.to_string();
                if message.trim().is_empty() {
                    View::Error(UNEXPECTED_ERROR.to_string())
                } else {
                    View::Error(message)
                }
            }
        };
        true
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, View::Loading)
    }
}
