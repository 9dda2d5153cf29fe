//! Solve results and their accumulation across cut iterations.

use crate::error::FailureKind;
use crate::model::Variant;
use serde::{Deserialize, Serialize};

/// Variant-specific drone assignment extracted from a solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Assignment {
    /// TSP: every customer is on the truck tour.
    TruckOnly,
    /// PDSTSP: (drone, customer) pairs served by depot round trips.
    DroneCustomers(Vec<(usize, usize)>),
    /// FSTSP: (launch, customer, recovery) sorties.
    DroneSorties(Vec<(usize, usize, usize)>),
}

/// Snapshot of one integral solution of the cut loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationRecord {
    /// Objective value of this iteration's optimum.
    pub objective: f64,
    /// Wall-clock seconds spent in this iteration.
    pub runtime: f64,
    /// Closed truck tours (FSTSP: the depot-to-depot path closed through
    /// the virtual return depot).
    pub truck_tours: Vec<Vec<usize>>,
    /// Drone side of the solution.
    pub assignment: Assignment,
}

/// Final report of one solve, serializable as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolveReport {
    pub name: String,
    pub variant: Variant,
    /// True iff the last iteration was subtour-free and optimal.
    pub optimal: bool,
    /// Objective of the accepted solution, if any iteration produced one.
    pub objective: Option<f64>,
    pub total_runtime: f64,
    pub model_build_runtime: f64,
    pub iteration_count: usize,
    pub variable_count: usize,
    pub total_constraint_count: usize,
    /// Subtour-elimination constraints added on top of the base model.
    pub additional_constraint_count: usize,
    /// Objective of the warm-start heuristic, when presolve ran.
    pub heuristic_bound: Option<f64>,
    /// Terminal reason when `optimal` is false.
    pub failure: Option<FailureKind>,
    pub iterations: Vec<IterationRecord>,
}

impl SolveReport {
    /// The accepted solution: the last recorded iteration.
    pub fn final_iteration(&self) -> Option<&IterationRecord> {
        self.iterations.last()
    }
}

/// Collects per-iteration snapshots during a solve and assembles the
/// final report.
#[derive(Debug)]
pub struct ResultAccumulator {
    name: String,
    variant: Variant,
    model_build_runtime: f64,
    heuristic_bound: Option<f64>,
    iterations: Vec<IterationRecord>,
}

impl ResultAccumulator {
    pub fn new(name: &str, variant: Variant) -> Self {
        ResultAccumulator {
            name: name.to_string(),
            variant,
            model_build_runtime: 0.0,
            heuristic_bound: None,
            iterations: Vec::new(),
        }
    }

    pub fn set_model_build_runtime(&mut self, seconds: f64) {
        self.model_build_runtime = seconds;
    }

    pub fn set_heuristic_bound(&mut self, objective: f64) {
        self.heuristic_bound = Some(objective);
    }

    pub fn record(&mut self, record: IterationRecord) {
        log::debug!(
            "iteration {}: objective {:.3}, {} tour(s)",
            self.iterations.len() + 1,
            record.objective,
            record.truck_tours.len()
        );
        self.iterations.push(record);
    }

    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }

    /// Assemble the report for a solve that proved optimality.
    pub fn finish_optimal(
        self,
        total_runtime: f64,
        variable_count: usize,
        total_constraint_count: usize,
        additional_constraint_count: usize,
    ) -> SolveReport {
        let objective = self.iterations.last().map(|r| r.objective);
        SolveReport {
            name: self.name,
            variant: self.variant,
            optimal: true,
            objective,
            total_runtime,
            model_build_runtime: self.model_build_runtime,
            iteration_count: self.iterations.len(),
            variable_count,
            total_constraint_count,
            additional_constraint_count,
            heuristic_bound: self.heuristic_bound,
            failure: None,
            iterations: self.iterations,
        }
    }

    /// Assemble the report for a solve that stopped without a proven
    /// optimum. Any iterations recorded before the failure are kept.
    pub fn finish_failed(
        self,
        failure: FailureKind,
        total_runtime: f64,
        variable_count: usize,
        total_constraint_count: usize,
        additional_constraint_count: usize,
    ) -> SolveReport {
        let objective = self.iterations.last().map(|r| r.objective);
        SolveReport {
            name: self.name,
            variant: self.variant,
            optimal: false,
            objective,
            total_runtime,
            model_build_runtime: self.model_build_runtime,
            iteration_count: self.iterations.len(),
            variable_count,
            total_constraint_count,
            additional_constraint_count,
            heuristic_bound: self.heuristic_bound,
            failure: Some(failure),
            iterations: self.iterations,
        }
    }
}
