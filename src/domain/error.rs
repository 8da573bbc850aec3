//! Failure taxonomy for unit-of-work execution.
//!
//! Four kinds of failure, split by the phase that raises them:
//! - `ArgumentMismatch` and `ConditionNotMet` come out of validation and
//!   mean the request itself is invalid.
//! - `ExecutionFailure` means a business rule blocked this attempt.
//! - `Rollback` wraps a failed compensation; it is reported to the error
//!   sink but never re-raised and never replaces the original failure.

use serde::Serialize;
use thiserror::Error;

use super::options::ArgKind;

/// A failure raised by any phase of a unit of work.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnitError {
    /// A declared argument was missing or had the wrong kind.
    #[error("argument `{param}` was expected to be {}, got {}", fmt_kinds(.expected), fmt_actual(.actual))]
    ArgumentMismatch {
        param: String,
        expected: Vec<ArgKind>,
        actual: Option<ArgKind>,
    },

    /// A business-rule precondition failed during validation.
    #[error("{message}")]
    ConditionNotMet { code: String, message: String },

    /// A business rule blocked completion during execution.
    #[error("{message}")]
    ExecutionFailure {
        code: String,
        message: String,
        context: serde_json::Map<String, serde_json::Value>,
    },

    /// A compensating action itself failed during rollback.
    #[error("step {step} could not be rolled back: {message}")]
    Rollback { step: usize, message: String },
}

impl UnitError {
    /// The symbolic code attached to the failure, if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::ConditionNotMet { code, .. } | Self::ExecutionFailure { code, .. } => {
                Some(code)
            }
            _ => None,
        }
    }

    /// True for failures raised by the validation phase. These signal
    /// "don't retry unmodified", as opposed to an `ExecutionFailure`
    /// which means only this attempt was blocked.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ArgumentMismatch { .. } | Self::ConditionNotMet { .. }
        )
    }

    /// True when this wraps a failed compensation.
    pub fn is_rollback(&self) -> bool {
        matches!(self, Self::Rollback { .. })
    }
}

fn fmt_kinds(expected: &[ArgKind]) -> String {
    let names: Vec<String> = expected.iter().map(|k| k.to_string()).collect();
    names.join(" or ")
}

fn fmt_actual(actual: &Option<ArgKind>) -> String {
    match actual {
        Some(kind) => kind.to_string(),
        None => "absent".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_mismatch_display() {
        let err = UnitError::ArgumentMismatch {
            param: "count".to_string(),
            expected: vec![ArgKind::Integer, ArgKind::Float],
            actual: None,
        };
        assert_eq!(
            err.to_string(),
            "argument `count` was expected to be integer or float, got absent"
        );
        assert!(err.is_validation());
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_condition_not_met_carries_code() {
        let err = UnitError::ConditionNotMet {
            code: "greet-already_greeted".to_string(),
            message: "Already greeted".to_string(),
        };
        assert_eq!(err.code(), Some("greet-already_greeted"));
        assert_eq!(err.to_string(), "Already greeted");
        assert!(err.is_validation());
    }

    #[test]
    fn test_execution_failure_is_not_validation() {
        let err = UnitError::ExecutionFailure {
            code: "pay-insufficient_funds".to_string(),
            message: "Insufficient funds".to_string(),
            context: serde_json::Map::new(),
        };
        assert!(!err.is_validation());
        assert!(!err.is_rollback());
    }

    #[test]
    fn test_rollback_display() {
        let err = UnitError::Rollback {
            step: 2,
            message: "record already gone".to_string(),
        };
        assert!(err.is_rollback());
        assert_eq!(
            err.to_string(),
            "step 2 could not be rolled back: record already gone"
        );
    }
}
