//! FSTSP formulation: the vertex set gains a virtual return depot at
//! index `dimension`, the truck drives a path from the start depot to
//! it, and drone sorties (launch, customer, recovery) cover the
//! customers the truck skips. The objective is truck driving time plus
//! the drone-flight duration carried by the per-edge wait variables.

use super::{edge_grid, Formulation, ModelBuilder, Variant};
use crate::engine::{LinExpr, Sense, SolverEngine, VarId, VarKind};
use crate::error::SolveError;
use crate::feasibility::FlightTable;
use crate::instance::TspdInstance;

pub struct FstspModel<'a> {
    instance: &'a TspdInstance,
    table: &'a FlightTable,
}

impl<'a> FstspModel<'a> {
    pub fn new(instance: &'a TspdInstance, table: &'a FlightTable) -> Self {
        FstspModel { instance, table }
    }

    fn flight_duration(&self, s: usize, c: usize, e: usize) -> f64 {
        self.instance.drone_time_aug(s, c) + self.instance.drone_time_aug(c, e)
    }
}

impl ModelBuilder for FstspModel<'_> {
    fn build(&self, engine: &mut dyn SolverEngine) -> Result<Formulation, SolveError> {
        let instance = self.instance;
        if instance.drone.is_none() {
            return Err(SolveError::InputData("FSTSP requires drone parameters".to_string()));
        }
        let n = instance.dimension;
        let n1 = n + 1;
        let flight_time = instance.flight_time();

        let edges = edge_grid(engine, n1, |i, j| instance.truck_time_aug(i, j));

        // per-edge wait variables bound the drone flight duration the
        // edge carries and feed it into the objective
        let mut waits = vec![vec![VarId(usize::MAX); n1]; n1];
        for i in 0..n1 {
            for j in i + 1..n1 {
                let w = engine.add_variable(
                    VarKind::Continuous,
                    0.0,
                    flight_time,
                    1.0,
                    &format!("w_{}_{}", i, j),
                );
                waits[i][j] = w;
                waits[j][i] = w;
            }
        }

        // sortie binaries exist only for feasible triples; a sortie that
        // launches and recovers at the same stop pays its duration
        // directly since no edge carries it
        let mut sorties = Vec::new();
        for c in 1..n {
            for s in 0..n1 {
                for e in 0..n1 {
                    if !self.table.feasible(s, c, e) {
                        continue;
                    }
                    let obj = if s == e { self.flight_duration(s, c, e) } else { 0.0 };
                    let var = engine.add_variable(
                        VarKind::Binary,
                        0.0,
                        1.0,
                        obj,
                        &format!("y_{}_{}_{}", s, c, e),
                    );
                    sorties.push((s, c, e, var));
                }
            }
        }
        log::debug!("{} feasible drone sorties", sorties.len());

        let mut base_constraints = 0;

        // each customer served exactly once, by truck path or sortie
        for c in 1..n {
            let mut serve = LinExpr::new();
            for j in 0..n1 {
                if j != c {
                    serve.add(edges[c][j], 0.5);
                }
            }
            for &(_, sc, _, var) in &sorties {
                if sc == c {
                    serve.add(var, 1.0);
                }
            }
            engine.add_constraint(serve, Sense::Eq, 1.0, &format!("serve_{}", c));
            base_constraints += 1;
        }

        // the truck leaves the start depot exactly once and stops at the
        // end depot exactly once
        let mut start = LinExpr::new();
        for j in 1..n1 {
            start.add(edges[0][j], 1.0);
        }
        engine.add_constraint(start, Sense::Eq, 1.0, "depot_out");
        base_constraints += 1;

        let mut finish = LinExpr::new();
        for j in 0..n {
            finish.add(edges[n][j], 1.0);
        }
        engine.add_constraint(finish, Sense::Eq, 1.0, "depot_in");
        base_constraints += 1;

        // the truck must visit both endpoints of every active sortie
        for &(s, _, e, var) in &sorties {
            let mut launch = LinExpr::new();
            launch.add(var, 1.0);
            for j in 0..n1 {
                if j != s {
                    launch.add(edges[s][j], -1.0);
                }
            }
            engine.add_constraint(launch, Sense::Le, 0.0, &format!("visit_launch_{}", var.index()));
            base_constraints += 1;

            if e != s {
                let mut recover = LinExpr::new();
                recover.add(var, 1.0);
                for j in 0..n1 {
                    if j != e {
                        recover.add(edges[e][j], -1.0);
                    }
                }
                engine.add_constraint(
                    recover,
                    Sense::Le,
                    0.0,
                    &format!("visit_recovery_{}", var.index()),
                );
                base_constraints += 1;
            }
        }

        // endpoint caps: at most two sortie endpoints per interior
        // node, at most one at either depot node
        for v in 0..n1 {
            let mut endpoints = LinExpr::new();
            for &(s, _, e, var) in &sorties {
                if s == v {
                    endpoints.add(var, 1.0);
                }
                if e == v {
                    endpoints.add(var, 1.0);
                }
            }
            if endpoints.is_empty() {
                continue;
            }
            let cap = if v == 0 || v == n { 1.0 } else { 2.0 };
            engine.add_constraint(endpoints, Sense::Le, cap, &format!("endpoints_{}", v));
            base_constraints += 1;
        }

        // each edge's wait variable absorbs the flight duration of the
        // sorties it carries
        for i in 0..n1 {
            for j in i + 1..n1 {
                let mut carried = LinExpr::new();
                for &(s, c, e, var) in &sorties {
                    if (s == i && e == j) || (s == j && e == i) {
                        carried.add(var, self.flight_duration(s, c, e));
                    }
                }
                if carried.is_empty() {
                    continue;
                }
                carried.add(waits[i][j], -1.0);
                engine.add_constraint(carried, Sense::Le, 0.0, &format!("wait_{}_{}", i, j));
                base_constraints += 1;
            }
        }

        Ok(Formulation {
            variant: Variant::Fstsp,
            node_count: n1,
            truck_edges: edges,
            makespan: None,
            drone_assignments: Vec::new(),
            drone_sorties: sorties,
            base_constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MicrolpEngine;
    use crate::instance::DroneParams;

    fn small_instance() -> TspdInstance {
        let mut instance = TspdInstance::from_matrix(
            "f3",
            vec![vec![0, 10, 7], vec![10, 0, 7], vec![7, 7, 0]],
        );
        instance.drone = Some(DroneParams::new(10.0, 30.0, 1));
        instance
    }

    #[test]
    fn test_builds_augmented_formulation() {
        let instance = small_instance();
        let table = FlightTable::build(&instance);
        let mut engine = MicrolpEngine::new();
        let formulation = FstspModel::new(&instance, &table).build(&mut engine).unwrap();

        assert_eq!(formulation.node_count, 4);
        // every sortie variable corresponds to a feasible triple
        for &(s, c, e, _) in &formulation.drone_sorties {
            assert!(table.feasible(s, c, e));
        }
        assert_eq!(engine.num_constraints(), formulation.base_constraints);
        // serve-once for both customers plus both depot constraints exist
        assert!(formulation.base_constraints >= 4);
    }

    #[test]
    fn test_requires_drone_parameters() {
        let instance = TspdInstance::from_matrix("f2", vec![vec![0, 1], vec![1, 0]]);
        let table_instance = small_instance();
        let table = FlightTable::build(&table_instance);
        let mut engine = MicrolpEngine::new();
        let err = FstspModel::new(&instance, &table).build(&mut engine).unwrap_err();
        assert!(matches!(err, SolveError::InputData(_)));
    }
}
