//! Solve orchestration: builds the variant's formulation, runs the
//! subtour cut loop to optimality and assembles the report.
//!
//! Two protocols drive the same cut machinery. In iterative mode each
//! integral optimum is inspected after `optimize` returns and violated
//! components are added as ordinary constraints before re-optimizing.
//! In lazy mode a candidate callback injects the same cuts inside a
//! single `optimize` call. Both terminate on the first subtour-free
//! optimum and report the same objective.

use crate::engine::{
    CandidateView, LinExpr, MicrolpEngine, Sense, SolveStatus, SolverEngine,
};
use crate::error::{FailureKind, SolveError};
use crate::feasibility::FlightTable;
use crate::instance::TspdInstance;
use crate::model::{Formulation, FstspModel, ModelBuilder, PdstspModel, TspModel, Variant};
use crate::result::{IterationRecord, ResultAccumulator, SolveReport};
use crate::subtour::{activation, detect_subtours, CutPool, CutSink};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Knobs for one solve.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Wall-clock budget in seconds; `None` runs to optimality.
    pub time_limit: Option<f64>,
    /// Inject cuts through the candidate callback instead of
    /// re-optimizing after each integral solution.
    pub lazy: bool,
    /// Solve an auxiliary full truck tour first, for warm-start hints
    /// and a feasible-makespan bound.
    pub presolve: bool,
    /// Number of engine threads (0 = automatic). Passed through to the
    /// backend, which may ignore it.
    pub threads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig { time_limit: None, lazy: false, presolve: true, threads: 0 }
    }
}

/// Emits cuts as ordinary constraints on the engine.
struct EngineSink<'a> {
    engine: &'a mut dyn SolverEngine,
}

impl CutSink for EngineSink<'_> {
    fn emit(&mut self, expr: LinExpr, sense: Sense, rhs: f64, name: &str) {
        self.engine.add_constraint(expr, sense, rhs, name);
    }
}

/// Emits cuts as lazy constraints through the candidate view.
struct LazySink<'a> {
    view: &'a mut dyn CandidateView,
}

impl CutSink for LazySink<'_> {
    fn emit(&mut self, expr: LinExpr, sense: Sense, rhs: f64, _name: &str) {
        self.view.inject(expr, sense, rhs);
    }
}

fn failure_of(status: &SolveStatus) -> Option<FailureKind> {
    match status {
        SolveStatus::Optimal => None,
        SolveStatus::Infeasible => Some(FailureKind::Infeasible),
        SolveStatus::Unbounded => Some(FailureKind::Unbounded),
        SolveStatus::InfeasibleOrUnbounded => {
            Some(FailureKind::Solver("infeasible or unbounded".to_string()))
        }
        SolveStatus::TimedOut => Some(FailureKind::Timeout),
        SolveStatus::Error(msg) => Some(FailureKind::Solver(msg.clone())),
    }
}

/// Drives one solve of one variant over one instance.
pub struct Solver<'a> {
    instance: &'a TspdInstance,
    config: SolverConfig,
}

impl<'a> Solver<'a> {
    pub fn new(instance: &'a TspdInstance, config: SolverConfig) -> Self {
        Solver { instance, config }
    }

    /// Validate the instance, build the model and run the cut loop.
    ///
    /// Terminal solver conditions (infeasible, unbounded, timeout) are
    /// reported through `SolveReport::failure`; only input and engine
    /// faults surface as errors.
    pub fn solve(&self, variant: Variant) -> Result<SolveReport, SolveError> {
        self.instance.validate()?;
        let start = Instant::now();
        let deadline = self
            .config
            .time_limit
            .map(|seconds| start + Duration::from_secs_f64(seconds));

        let mut engine = MicrolpEngine::new();
        let build_start = Instant::now();
        let formulation = match variant {
            Variant::Tsp => TspModel::new(self.instance).build(&mut engine)?,
            Variant::Pdstsp => PdstspModel::new(self.instance).build(&mut engine)?,
            Variant::Fstsp => {
                // checked before the table build, which needs flight times
                if self.instance.drone.is_none() {
                    return Err(SolveError::InputData(
                        "FSTSP requires drone parameters".to_string(),
                    ));
                }
                let table = FlightTable::build(self.instance);
                FstspModel::new(self.instance, &table).build(&mut engine)?
            }
        };
        let mut acc = ResultAccumulator::new(&self.instance.name, variant);
        acc.set_model_build_runtime(build_start.elapsed().as_secs_f64());
        log::info!(
            "built {} model for '{}': {} variables, {} constraints",
            variant,
            self.instance.name,
            engine.num_variables(),
            engine.num_constraints()
        );

        if self.config.presolve && variant.uses_drone() {
            if let Some(bound) = self.warm_start(&mut engine, &formulation, deadline)? {
                acc.set_heuristic_bound(bound);
            }
        }

        engine.set_threads(self.config.threads);
        engine.set_deadline(deadline);
        if self.config.lazy {
            self.solve_lazy(engine, formulation, acc, start)
        } else {
            self.solve_iterative(engine, formulation, acc, start, deadline)
        }
    }

    fn solve_iterative(
        &self,
        mut engine: MicrolpEngine,
        formulation: Formulation,
        mut acc: ResultAccumulator,
        start: Instant,
        deadline: Option<Instant>,
    ) -> Result<SolveReport, SolveError> {
        let mut pool = CutPool::new();
        loop {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(acc.finish_failed(
                    FailureKind::Timeout,
                    start.elapsed().as_secs_f64(),
                    engine.num_variables(),
                    engine.num_constraints(),
                    pool.cuts_added(),
                ));
            }

            let pass_start = Instant::now();
            let status = engine.optimize();
            if let Some(failure) = failure_of(&status) {
                return Ok(acc.finish_failed(
                    failure,
                    start.elapsed().as_secs_f64(),
                    engine.num_variables(),
                    engine.num_constraints(),
                    pool.cuts_added(),
                ));
            }

            let active = formulation.activation_matrix(|v| engine.value(v));
            acc.record(IterationRecord {
                objective: engine.objective_value(),
                runtime: pass_start.elapsed().as_secs_f64(),
                truck_tours: formulation.truck_tours(&active),
                assignment: formulation.assignment(|v| engine.value(v)),
            });

            let subtours = detect_subtours(&active);
            let mut sink = EngineSink { engine: &mut engine };
            let added =
                pool.generate(&subtours, formulation.variant, &formulation.truck_edges, &mut sink);
            if added == 0 {
                return Ok(acc.finish_optimal(
                    start.elapsed().as_secs_f64(),
                    engine.num_variables(),
                    engine.num_constraints(),
                    pool.cuts_added(),
                ));
            }
        }
    }

    fn solve_lazy(
        &self,
        mut engine: MicrolpEngine,
        formulation: Formulation,
        mut acc: ResultAccumulator,
        start: Instant,
    ) -> Result<SolveReport, SolveError> {
        let edges = formulation.truck_edges.clone();
        let variant = formulation.variant;
        let pool = Rc::new(RefCell::new(CutPool::new()));
        let pool_cb = Rc::clone(&pool);

        engine.set_candidate_callback(Box::new(move |view| {
            let n = edges.len();
            let mut active = vec![vec![0u8; n]; n];
            for i in 0..n {
                for j in i + 1..n {
                    let a = activation(view.value(edges[i][j]));
                    active[i][j] = a;
                    active[j][i] = a;
                }
            }
            let subtours = detect_subtours(&active);
            let mut sink = LazySink { view };
            pool_cb.borrow_mut().generate(&subtours, variant, &edges, &mut sink);
        }));

        let pass_start = Instant::now();
        let status = engine.optimize();
        let cuts = pool.borrow().cuts_added();
        if let Some(failure) = failure_of(&status) {
            return Ok(acc.finish_failed(
                failure,
                start.elapsed().as_secs_f64(),
                engine.num_variables(),
                engine.num_constraints(),
                cuts,
            ));
        }

        let active = formulation.activation_matrix(|v| engine.value(v));
        acc.record(IterationRecord {
            objective: engine.objective_value(),
            runtime: pass_start.elapsed().as_secs_f64(),
            truck_tours: formulation.truck_tours(&active),
            assignment: formulation.assignment(|v| engine.value(v)),
        });
        Ok(acc.finish_optimal(
            start.elapsed().as_secs_f64(),
            engine.num_variables(),
            engine.num_constraints(),
            cuts,
        ))
    }

    /// Solve an auxiliary full truck tour, hint its edges to the main
    /// model and return its duration as a feasible-makespan bound. A
    /// failed auxiliary solve is non-fatal and only skips the hints.
    fn warm_start(
        &self,
        engine: &mut MicrolpEngine,
        formulation: &Formulation,
        deadline: Option<Instant>,
    ) -> Result<Option<f64>, SolveError> {
        let aux_start = Instant::now();
        let mut aux = MicrolpEngine::new();
        let tour_model = TspModel::new(self.instance).build(&mut aux)?;
        aux.set_deadline(deadline);

        let mut pool = CutPool::new();
        loop {
            match aux.optimize() {
                SolveStatus::Optimal => {}
                status => {
                    log::warn!("warm-start tour solve stopped early: {:?}", status);
                    return Ok(None);
                }
            }
            let active = tour_model.activation_matrix(|v| aux.value(v));
            let subtours = detect_subtours(&active);
            let mut sink = EngineSink { engine: &mut aux };
            if pool.generate(&subtours, Variant::Tsp, &tour_model.truck_edges, &mut sink) == 0 {
                break;
            }
        }

        let active = tour_model.activation_matrix(|v| aux.value(v));
        let n = self.instance.dimension;
        for i in 0..n {
            for j in i + 1..n {
                engine.set_start_hint(formulation.truck_edges[i][j], f64::from(active[i][j]));
            }
        }
        let bound = aux.objective_value() / self.instance.truck_speed;
        log::info!(
            "warm start: full truck tour of duration {:.3} found in {:.3}s",
            bound,
            aux_start.elapsed().as_secs_f64()
        );
        Ok(Some(bound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::DroneParams;
    use crate::result::Assignment;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    /// Rounded Euclidean distances of the convex pentagon (0,0), (2,0),
    /// (3,2), (1,3), (-1,2): every hull edge rounds to 2, every chord
    /// to 3 or 4, so the optimal tour is the hull with perimeter 10.
    fn pentagon() -> TspdInstance {
        TspdInstance::from_matrix(
            "pentagon",
            vec![
                vec![0, 2, 4, 3, 2],
                vec![2, 0, 2, 3, 4],
                vec![4, 2, 0, 2, 4],
                vec![3, 3, 2, 0, 2],
                vec![2, 4, 4, 2, 0],
            ],
        )
    }

    /// Two tight triangles {0,1,2} and {3,4,5} with expensive cross
    /// edges. The first integral optimum is the pair of triangles and
    /// must be cut away.
    fn clusters() -> TspdInstance {
        let n = 6;
        let mut d = vec![vec![0i64; n]; n];
        for i in 0..n {
            for j in 0..n {
                if i != j {
                    d[i][j] = if (i < 3) == (j < 3) { 1 } else { 141 };
                }
            }
        }
        TspdInstance::from_matrix("clusters", d)
    }

    #[test]
    fn test_pentagon_tour_follows_the_hull() {
        let instance = pentagon();
        let report = Solver::new(&instance, SolverConfig::default())
            .solve(Variant::Tsp)
            .unwrap();
        assert!(report.optimal);
        assert!(approx(report.objective.unwrap(), 10.0));
        // two-vertex components cannot occur with binary edges, so the
        // first integral optimum is already the hull tour
        assert_eq!(report.iteration_count, 1);
        assert_eq!(report.additional_constraint_count, 0);
        let tours = &report.final_iteration().unwrap().truck_tours;
        assert_eq!(tours.len(), 1);
        let tour = &tours[0];
        assert_eq!(tour.len(), 5);
        assert_eq!(tour[0], 0);
        // hull order in either direction: every step is a length-2 edge
        for k in 0..5 {
            assert_eq!(instance.distance(tour[k], tour[(k + 1) % 5]), 2);
        }
    }

    #[test]
    fn test_clustered_instance_needs_elimination_cuts() {
        let instance = clusters();
        let report = Solver::new(&instance, SolverConfig::default())
            .solve(Variant::Tsp)
            .unwrap();
        assert!(report.optimal);
        // a tour crossing the clusters twice: 4 * 1 + 2 * 141
        assert!(approx(report.objective.unwrap(), 286.0));
        assert!(report.iteration_count >= 2);
        assert!(report.additional_constraint_count >= 2);
        // the first pass found the two triangles
        assert!(approx(report.iterations[0].objective, 6.0));
        let last = report.final_iteration().unwrap();
        assert_eq!(last.truck_tours.len(), 1);
        assert_eq!(last.truck_tours[0].len(), 6);
    }

    #[test]
    fn test_lazy_mode_matches_iterative() {
        let instance = clusters();
        let iterative = Solver::new(&instance, SolverConfig::default())
            .solve(Variant::Tsp)
            .unwrap();
        let lazy = Solver::new(
            &instance,
            SolverConfig { lazy: true, ..SolverConfig::default() },
        )
        .solve(Variant::Tsp)
        .unwrap();

        assert!(lazy.optimal);
        assert!(approx(lazy.objective.unwrap(), iterative.objective.unwrap()));
        // one engine call drives the whole lazy protocol
        assert_eq!(lazy.iteration_count, 1);
        assert!(lazy.additional_constraint_count >= 2);
    }

    #[test]
    fn test_pdstsp_drone_serves_near_customer() {
        // depot (0,0), customers (10,0), (0,1), (10,5); only the
        // customer one unit away fits the depot round trip
        let mut instance = TspdInstance::from_matrix(
            "pd",
            vec![
                vec![0, 10, 1, 11],
                vec![10, 0, 10, 5],
                vec![1, 10, 0, 11],
                vec![11, 5, 11, 0],
            ],
        );
        instance.drone = Some(DroneParams::new(1.0, 4.0, 1));

        let report = Solver::new(&instance, SolverConfig::default())
            .solve(Variant::Pdstsp)
            .unwrap();
        assert!(report.optimal);
        // truck tour 0-1-3-0 takes 26, drone round trip takes 2
        assert!(approx(report.objective.unwrap(), 26.0));
        // the warm-start bound is the best full truck tour
        assert!(approx(report.heuristic_bound.unwrap(), 27.0));
        let last = report.final_iteration().unwrap();
        assert_eq!(last.assignment, Assignment::DroneCustomers(vec![(0, 2)]));
        assert_eq!(last.truck_tours.len(), 1);
        assert!(last.truck_tours[0].contains(&1));
        assert!(last.truck_tours[0].contains(&3));
        // the drone customer is off the truck tour entirely
        assert!(!last.truck_tours[0].contains(&2));
    }

    #[test]
    fn test_fstsp_sortie_from_truck_stop() {
        // truck drives 0-2-return (14); the drone launches at 2,
        // serves 1 and returns (1.4)
        let mut instance = TspdInstance::from_matrix(
            "fs",
            vec![vec![0, 10, 7], vec![10, 0, 7], vec![7, 7, 0]],
        );
        instance.drone = Some(DroneParams::new(10.0, 30.0, 1));

        let report = Solver::new(&instance, SolverConfig::default())
            .solve(Variant::Fstsp)
            .unwrap();
        assert!(report.optimal);
        assert!(approx(report.objective.unwrap(), 15.4));
        let last = report.final_iteration().unwrap();
        assert_eq!(last.assignment, Assignment::DroneSorties(vec![(2, 1, 2)]));
    }

    #[test]
    fn test_fstsp_requires_drone_parameters() {
        // missing drone parameters must be rejected before the flight
        // table is built
        let instance = TspdInstance::from_matrix("fs2", vec![vec![0, 1], vec![1, 0]]);
        let err = Solver::new(&instance, SolverConfig::default())
            .solve(Variant::Fstsp)
            .unwrap_err();
        assert!(matches!(err, SolveError::InputData(_)));
    }

    #[test]
    fn test_thread_count_passes_through() {
        let instance = pentagon();
        let config = SolverConfig { threads: 2, ..SolverConfig::default() };
        let report = Solver::new(&instance, config).solve(Variant::Tsp).unwrap();
        assert!(report.optimal);
        assert!(approx(report.objective.unwrap(), 10.0));
    }

    #[test]
    fn test_fstsp_lazy_matches_iterative() {
        let mut instance = TspdInstance::from_matrix(
            "fs",
            vec![vec![0, 10, 7], vec![10, 0, 7], vec![7, 7, 0]],
        );
        instance.drone = Some(DroneParams::new(10.0, 30.0, 1));

        let lazy = Solver::new(
            &instance,
            SolverConfig { lazy: true, ..SolverConfig::default() },
        )
        .solve(Variant::Fstsp)
        .unwrap();
        assert!(lazy.optimal);
        assert!(approx(lazy.objective.unwrap(), 15.4));
    }

    #[test]
    fn test_zero_time_limit_reports_timeout() {
        let instance = pentagon();
        let config = SolverConfig { time_limit: Some(0.0), ..SolverConfig::default() };
        let report = Solver::new(&instance, config).solve(Variant::Tsp).unwrap();
        assert!(!report.optimal);
        assert_eq!(report.failure, Some(FailureKind::Timeout));
        assert_eq!(report.objective, None);
        assert_eq!(report.iteration_count, 0);
    }

    #[test]
    fn test_invalid_instance_is_rejected() {
        // asymmetric matrix
        let instance = TspdInstance::from_matrix("bad", vec![vec![0, 1], vec![2, 0]]);
        let err = Solver::new(&instance, SolverConfig::default())
            .solve(Variant::Tsp)
            .unwrap_err();
        assert!(matches!(err, SolveError::InputData(_)));
    }
}
