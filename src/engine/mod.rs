//! Narrow interface to the MIP solver engine.
//!
//! The solver core never implements simplex or branch-and-bound itself:
//! every formulation is emitted through the [`SolverEngine`] trait and
//! every solution value is read back through it. The default backend is
//! [`MicrolpEngine`], a pure-Rust mixed-integer solver; richer engines
//! can be plugged in behind the same seam.

mod microlp;

pub use self::microlp::MicrolpEngine;

use std::collections::BTreeMap;
use std::time::Instant;

/// Opaque handle to a decision variable owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Sequence number of the variable in creation order.
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Kind of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Continuous,
}

/// Sense of a linear constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Eq,
    Ge,
}

/// Outcome of an optimize call.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    InfeasibleOrUnbounded,
    TimedOut,
    Error(String),
}

/// A linear expression over engine variables.
///
/// Terms for the same variable are merged, so callers may freely add the
/// two directed views of a shared symmetric edge variable without
/// producing duplicate columns in a constraint row.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    terms: BTreeMap<usize, f64>,
}

impl LinExpr {
    pub fn new() -> Self {
        LinExpr { terms: BTreeMap::new() }
    }

    /// Add `coeff * var`, merging with any existing term for `var`.
    pub fn add(&mut self, var: VarId, coeff: f64) {
        *self.terms.entry(var.0).or_insert(0.0) += coeff;
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Iterate the merged terms in variable order, skipping zeros.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms
            .iter()
            .filter(|(_, &c)| c != 0.0)
            .map(|(&v, &c)| (VarId(v), c))
    }
}

/// Read/write view of an integral candidate, passed to the registered
/// candidate callback. `inject` is only valid from inside the callback;
/// injected cuts take effect before the engine reports optimality.
pub trait CandidateView {
    /// Value of a variable in the current integral candidate.
    fn value(&self, var: VarId) -> f64;

    /// Inject a lazy constraint that invalidates this candidate.
    fn inject(&mut self, expr: LinExpr, sense: Sense, rhs: f64);
}

/// Callback invoked by the engine for each integral candidate found
/// during a single optimize call. Invocations are serialized by the
/// engine; the closure owns all of its mutable state.
pub type CandidateCallback = Box<dyn FnMut(&mut dyn CandidateView)>;

/// The engine operations the solver core depends on.
pub trait SolverEngine {
    /// Create a decision variable and return its handle.
    fn add_variable(&mut self, kind: VarKind, lb: f64, ub: f64, obj: f64, name: &str) -> VarId;

    /// Add a linear constraint. The name is kept for diagnostics only.
    fn add_constraint(&mut self, expr: LinExpr, sense: Sense, rhs: f64, name: &str);

    /// Supply a warm-start hint for a variable. Backends without warm
    /// starts may record and ignore it.
    fn set_start_hint(&mut self, var: VarId, value: f64);

    /// Register the candidate callback used in lazy-constraint mode.
    fn set_candidate_callback(&mut self, callback: CandidateCallback);

    /// Set the number of solver threads (0 = automatic). Backends
    /// without internal parallelism may record and ignore it.
    fn set_threads(&mut self, threads: usize);

    /// Set the wall-clock deadline checked at engine check-in points.
    fn set_deadline(&mut self, deadline: Option<Instant>);

    /// Ask the engine to stop at its next check-in point.
    fn request_termination(&mut self);

    /// Run the optimization. In lazy mode this single call drives the
    /// callback protocol to completion.
    fn optimize(&mut self) -> SolveStatus;

    /// Value of a variable in the last solution.
    fn value(&self, var: VarId) -> f64;

    /// Objective value of the last solution.
    fn objective_value(&self) -> f64;

    fn num_variables(&self) -> usize;

    fn num_constraints(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linexpr_merges_duplicate_terms() {
        let mut expr = LinExpr::new();
        expr.add(VarId(3), 0.5);
        expr.add(VarId(1), 1.0);
        expr.add(VarId(3), 0.5);
        let terms: Vec<_> = expr.terms().collect();
        assert_eq!(terms, vec![(VarId(1), 1.0), (VarId(3), 1.0)]);
    }

    #[test]
    fn test_linexpr_drops_cancelled_terms() {
        let mut expr = LinExpr::new();
        expr.add(VarId(0), 1.0);
        expr.add(VarId(0), -1.0);
        assert_eq!(expr.terms().count(), 0);
    }
}
