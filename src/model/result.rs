//! Apply result model.
//!
//! Persisted per session by the session store and read back by the result
//! view, so it round-trips through JSON exactly.

use serde::{Deserialize, Serialize};

/// Outcome of one apply call.
///
/// Every target handed to the apply engine lands in exactly one of
/// `applied` or `failures`, in apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Full names that were created or updated
    pub applied: Vec<String>,
    /// Full names that failed, with a classified message
    pub failures: Vec<ApplyFailure>,
}

/// A single failed target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyFailure {
    pub full_name: String,
    pub error: String,
}

impl ApplyFailure {
    pub fn new(full_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            error: error.into(),
        }
    }
}

impl ApplyResult {
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    #[must_use]
    pub fn failures_count(&self) -> usize {
        self.failures.len()
    }

    /// True when nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
