//! Error kinds for the solver core.
//!
//! `SolveError` covers hard failures that abort a solve before it can
//! produce a usable report (bad input data, a broken engine call).
//! Terminal solver conditions (infeasible, unbounded, timeout, engine
//! failure) do not abort: they are recorded as a `FailureKind` on the
//! returned report so the caller can inspect the reason.

use serde::{Deserialize, Serialize};

/// Hard failure raised before or around engine use.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// Invalid instance data, rejected before any variable is created.
    InputData(String),
    /// An engine call failed outside the normal status protocol.
    Engine(String),
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::InputData(msg) => write!(f, "invalid input data: {}", msg),
            SolveError::Engine(msg) => write!(f, "solver engine error: {}", msg),
        }
    }
}

impl std::error::Error for SolveError {}

/// Terminal reason recorded on a report when a solve ends without a
/// proven optimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The model admits no feasible assignment.
    Infeasible,
    /// The objective is unbounded below.
    Unbounded,
    /// The wall-clock budget elapsed before optimality was proven.
    Timeout,
    /// The engine reported a failure; the message is engine-specific.
    Solver(String),
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Infeasible => write!(f, "model infeasible"),
            FailureKind::Unbounded => write!(f, "model unbounded"),
            FailureKind::Timeout => write!(f, "time limit exceeded"),
            FailureKind::Solver(msg) => write!(f, "solver error: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = SolveError::InputData("matrix not square".to_string());
        assert!(e.to_string().contains("matrix not square"));

        let f = FailureKind::Solver("numerical trouble".to_string());
        assert!(f.to_string().contains("numerical trouble"));
    }
}
