//! Default engine backend built on the `microlp` mixed-integer solver.
//!
//! microlp has no native candidate callback, so lazy-constraint mode is
//! realized as a solve/inspect/re-solve loop inside a single
//! [`SolverEngine::optimize`] call: after each integral solve the
//! registered callback inspects the candidate and may inject cuts; the
//! model is re-solved until the callback stays silent. Warm-start hints
//! are recorded but not exploited (microlp has no such primitive).

use super::{CandidateCallback, CandidateView, LinExpr, Sense, SolveStatus, SolverEngine, VarId, VarKind};
use microlp::{ComparisonOp, OptimizationDirection, Problem, Solution, Variable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A minimizing MIP model held by microlp.
pub struct MicrolpEngine {
    problem: Problem,
    vars: Vec<Variable>,
    solution: Option<Solution>,
    callback: Option<CandidateCallback>,
    constraint_count: usize,
    hint_count: usize,
    threads: usize,
    deadline: Option<Instant>,
    cancel: Arc<AtomicBool>,
}

impl MicrolpEngine {
    pub fn new() -> Self {
        MicrolpEngine {
            problem: Problem::new(OptimizationDirection::Minimize),
            vars: Vec::new(),
            solution: None,
            callback: None,
            constraint_count: 0,
            hint_count: 0,
            threads: 0,
            deadline: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    fn out_of_time(&self) -> bool {
        if self.cancel.load(Ordering::Relaxed) {
            return true;
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    fn push_constraint(&mut self, expr: LinExpr, sense: Sense, rhs: f64) {
        let terms: Vec<(Variable, f64)> =
            expr.terms().map(|(v, c)| (self.vars[v.index()], c)).collect();
        let op = match sense {
            Sense::Le => ComparisonOp::Le,
            Sense::Eq => ComparisonOp::Eq,
            Sense::Ge => ComparisonOp::Ge,
        };
        self.problem.add_constraint(&terms, op, rhs);
        self.constraint_count += 1;
    }
}

impl Default for MicrolpEngine {
    fn default() -> Self {
        Self::new()
    }
}

struct MicrolpCandidate<'a> {
    vars: &'a [Variable],
    solution: &'a Solution,
    pending: Vec<(LinExpr, Sense, f64)>,
}

impl CandidateView for MicrolpCandidate<'_> {
    fn value(&self, var: VarId) -> f64 {
        *self.solution.var_value(self.vars[var.index()])
    }

    fn inject(&mut self, expr: LinExpr, sense: Sense, rhs: f64) {
        self.pending.push((expr, sense, rhs));
    }
}

impl SolverEngine for MicrolpEngine {
    fn add_variable(&mut self, kind: VarKind, lb: f64, ub: f64, obj: f64, name: &str) -> VarId {
        let var = match kind {
            VarKind::Binary => self.problem.add_integer_var(obj, (lb as i32, ub as i32)),
            VarKind::Continuous => self.problem.add_var(obj, (lb, ub)),
        };
        log::trace!("variable {} created as column {}", name, self.vars.len());
        self.vars.push(var);
        VarId(self.vars.len() - 1)
    }

    fn add_constraint(&mut self, expr: LinExpr, sense: Sense, rhs: f64, name: &str) {
        log::trace!("constraint {} with {} terms", name, expr.len());
        self.push_constraint(expr, sense, rhs);
    }

    fn set_start_hint(&mut self, var: VarId, value: f64) {
        // No warm-start support in microlp; keep count for diagnostics.
        let _ = (var, value);
        self.hint_count += 1;
        if self.hint_count == 1 {
            log::debug!("warm-start hints are recorded but not used by the microlp backend");
        }
    }

    fn set_candidate_callback(&mut self, callback: CandidateCallback) {
        self.callback = Some(callback);
    }

    fn set_threads(&mut self, threads: usize) {
        // microlp's simplex is single-threaded; keep for diagnostics
        self.threads = threads;
        if self.threads != 0 {
            log::debug!(
                "thread count {} is recorded but not used by the microlp backend",
                self.threads
            );
        }
    }

    fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    fn request_termination(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    fn optimize(&mut self) -> SolveStatus {
        loop {
            if self.out_of_time() {
                return SolveStatus::TimedOut;
            }

            let solution = match self.problem.solve() {
                Ok(solution) => solution,
                Err(microlp::Error::Infeasible) => return SolveStatus::Infeasible,
                Err(microlp::Error::Unbounded) => return SolveStatus::Unbounded,
                Err(microlp::Error::InternalError(msg)) => return SolveStatus::Error(msg),
            };
            self.solution = Some(solution);

            // Without a registered callback a single solve is final.
            let mut callback = match self.callback.take() {
                Some(callback) => callback,
                None => return SolveStatus::Optimal,
            };

            let pending = {
                let mut view = MicrolpCandidate {
                    vars: &self.vars,
                    solution: self.solution.as_ref().expect("solution just stored"),
                    pending: Vec::new(),
                };
                callback(&mut view);
                view.pending
            };
            self.callback = Some(callback);

            if pending.is_empty() {
                return SolveStatus::Optimal;
            }
            log::debug!("candidate rejected, {} lazy constraints injected", pending.len());
            for (expr, sense, rhs) in pending {
                self.push_constraint(expr, sense, rhs);
            }
        }
    }

    fn value(&self, var: VarId) -> f64 {
        match &self.solution {
            Some(solution) => *solution.var_value(self.vars[var.index()]),
            None => 0.0,
        }
    }

    fn objective_value(&self) -> f64 {
        match &self.solution {
            Some(solution) => solution.objective(),
            None => f64::INFINITY,
        }
    }

    fn num_variables(&self) -> usize {
        self.vars.len()
    }

    fn num_constraints(&self) -> usize {
        self.constraint_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(terms: &[(VarId, f64)]) -> LinExpr {
        let mut e = LinExpr::new();
        for &(v, c) in terms {
            e.add(v, c);
        }
        e
    }

    #[test]
    fn test_solves_small_milp() {
        let mut engine = MicrolpEngine::new();
        // min x + 2y with x + y >= 3, x binary, y continuous in [0, 10]
        let x = engine.add_variable(VarKind::Binary, 0.0, 1.0, 1.0, "x");
        let y = engine.add_variable(VarKind::Continuous, 0.0, 10.0, 2.0, "y");
        engine.add_constraint(expr(&[(x, 1.0), (y, 1.0)]), Sense::Ge, 3.0, "cover");

        assert_eq!(engine.optimize(), SolveStatus::Optimal);
        assert!((engine.value(x) - 1.0).abs() < 1e-6);
        assert!((engine.value(y) - 2.0).abs() < 1e-6);
        assert!((engine.objective_value() - 5.0).abs() < 1e-6);
        assert_eq!(engine.num_variables(), 2);
        assert_eq!(engine.num_constraints(), 1);
    }

    #[test]
    fn test_reports_infeasible() {
        let mut engine = MicrolpEngine::new();
        let x = engine.add_variable(VarKind::Binary, 0.0, 1.0, 1.0, "x");
        engine.add_constraint(expr(&[(x, 1.0)]), Sense::Ge, 2.0, "impossible");
        assert_eq!(engine.optimize(), SolveStatus::Infeasible);
    }

    #[test]
    fn test_fixed_zero_binary() {
        let mut engine = MicrolpEngine::new();
        // A profitable variable pinned to zero must stay at zero.
        let x = engine.add_variable(VarKind::Binary, 0.0, 0.0, -5.0, "x_fixed");
        let y = engine.add_variable(VarKind::Binary, 0.0, 1.0, -1.0, "y");
        engine.add_constraint(expr(&[(x, 1.0), (y, 1.0)]), Sense::Le, 2.0, "cap");
        assert_eq!(engine.optimize(), SolveStatus::Optimal);
        assert!(engine.value(x).abs() < 1e-6);
        assert!((engine.value(y) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lazy_callback_injects_until_silent() {
        let mut engine = MicrolpEngine::new();
        // max x + 2y; the callback rejects any candidate with both set.
        let x = engine.add_variable(VarKind::Binary, 0.0, 1.0, -1.0, "x");
        let y = engine.add_variable(VarKind::Binary, 0.0, 1.0, -2.0, "y");
        engine.set_candidate_callback(Box::new(move |view| {
            if view.value(x) + view.value(y) > 1.5 {
                let mut cut = LinExpr::new();
                cut.add(x, 1.0);
                cut.add(y, 1.0);
                view.inject(cut, Sense::Le, 1.0);
            }
        }));
        assert_eq!(engine.optimize(), SolveStatus::Optimal);
        // y alone is the best candidate surviving the cut
        assert!(engine.value(x).abs() < 1e-6);
        assert!((engine.value(y) - 1.0).abs() < 1e-6);
        assert!((engine.objective_value() - (-2.0)).abs() < 1e-6);
        // exactly one lazy cut was added
        assert_eq!(engine.num_constraints(), 1);
    }

    #[test]
    fn test_thread_setting_is_inert() {
        let mut engine = MicrolpEngine::new();
        let x = engine.add_variable(VarKind::Binary, 0.0, 1.0, -1.0, "x");
        engine.set_threads(4);
        assert_eq!(engine.optimize(), SolveStatus::Optimal);
        assert!((engine.value(x) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_termination_request_times_out() {
        let mut engine = MicrolpEngine::new();
        let x = engine.add_variable(VarKind::Binary, 0.0, 1.0, 1.0, "x");
        engine.add_constraint(expr(&[(x, 1.0)]), Sense::Ge, 1.0, "force");
        engine.request_termination();
        assert_eq!(engine.optimize(), SolveStatus::TimedOut);
    }
}
