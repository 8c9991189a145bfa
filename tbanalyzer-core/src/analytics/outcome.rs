//! Typed result of a single analysis view.
//!
//! Every service operation reports one of three states so callers can tell
//! "nothing to analyze" apart from "analysis broke".

use crate::types::Column;
use serde::{Deserialize, Serialize};

/// Why a view has no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum EmptyReason {
    /// Input table has zero rows
    NoRows,
    /// A column the view needs is absent
    MissingColumn { column: Column },
    /// DATE exists but no cell parses as a date
    NoValidDates,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyReason::NoRows => f.write_str("no rows"),
            EmptyReason::MissingColumn { column } => write!(f, "missing {} column", column),
            EmptyReason::NoValidDates => f.write_str("no valid dates"),
        }
    }
}

/// Outcome of one analysis operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Outcome<T> {
    /// Computed successfully
    Ready(T),
    /// Nothing to compute
    Empty(EmptyReason),
    /// Computation failed; carries the reason
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Outcome::Empty(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// Borrow the value if ready.
    pub fn ready(&self) -> Option<&T> {
        match self {
            Outcome::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_ready(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ready(value) => Outcome::Ready(f(value)),
            Outcome::Empty(reason) => Outcome::Empty(reason),
            Outcome::Failed(reason) => Outcome::Failed(reason),
        }
    }

    /// Status label for logs and JSON output.
    pub fn status(&self) -> &'static str {
        match self {
            Outcome::Ready(_) => "ready",
            Outcome::Empty(_) => "empty",
            Outcome::Failed(_) => "failed",
        }
    }
}

/// Early exit from an analysis step; converts into a non-ready [`Outcome`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Halt {
    Empty(EmptyReason),
    Failed(String),
}

impl From<EmptyReason> for Halt {
    fn from(reason: EmptyReason) -> Self {
        Halt::Empty(reason)
    }
}

impl<T> From<std::result::Result<T, Halt>> for Outcome<T> {
    fn from(result: std::result::Result<T, Halt>) -> Self {
        match result {
            Ok(value) => Outcome::Ready(value),
            Err(Halt::Empty(reason)) => Outcome::Empty(reason),
            Err(Halt::Failed(reason)) => Outcome::Failed(reason),
        }
    }
}
