//! PDSTSP formulation: drones fly independent depot round trips while
//! the truck tours the remaining customers; a continuous makespan
//! variable T is the sole objective term.

use super::{edge_grid, Formulation, ModelBuilder, Variant};
use crate::engine::{LinExpr, Sense, SolverEngine, VarKind};
use crate::error::SolveError;
use crate::feasibility::pdstsp_in_range;
use crate::instance::TspdInstance;

pub struct PdstspModel<'a> {
    instance: &'a TspdInstance,
}

impl<'a> PdstspModel<'a> {
    pub fn new(instance: &'a TspdInstance) -> Self {
        PdstspModel { instance }
    }
}

impl ModelBuilder for PdstspModel<'_> {
    fn build(&self, engine: &mut dyn SolverEngine) -> Result<Formulation, SolveError> {
        let instance = self.instance;
        let drone = instance
            .drone
            .as_ref()
            .ok_or_else(|| SolveError::InputData("PDSTSP requires drone parameters".to_string()))?;
        let n = instance.dimension;
        let fleet = drone.fleet_size;
        let in_range = pdstsp_in_range(instance);
        log::debug!("{} of {} customers are drone-reachable", in_range.len(), n - 1);

        // truck edges carry no cost of their own; T is the objective
        let edges = edge_grid(engine, n, |_, _| 0.0);
        let makespan = engine.add_variable(VarKind::Continuous, 0.0, f64::INFINITY, 1.0, "T");

        // y_v_i for every drone and customer; out-of-range customers
        // get a variable fixed to zero
        let mut assignments = Vec::new();
        for v in 0..fleet {
            for c in 1..n {
                let ub = if in_range.contains(&c) { 1.0 } else { 0.0 };
                let var = engine.add_variable(
                    VarKind::Binary,
                    0.0,
                    ub,
                    0.0,
                    &format!("y_{}_{}", v, c),
                );
                assignments.push((v, c, var));
            }
        }

        let mut base_constraints = 0;

        // the truck tour duration bounds the makespan
        let mut truck = LinExpr::new();
        for i in 0..n {
            for j in i + 1..n {
                truck.add(edges[i][j], instance.truck_time(i, j));
            }
        }
        truck.add(makespan, -1.0);
        engine.add_constraint(truck, Sense::Le, 0.0, "truck_time");
        base_constraints += 1;

        // each drone's summed round trips bound the makespan
        for v in 0..fleet {
            let mut load = LinExpr::new();
            for &(dv, c, var) in &assignments {
                if dv == v && in_range.contains(&c) {
                    load.add(var, instance.drone_time(0, c) + instance.drone_time(c, 0));
                }
            }
            load.add(makespan, -1.0);
            engine.add_constraint(load, Sense::Le, 0.0, &format!("drone_{}", v));
            base_constraints += 1;
        }

        // each customer served exactly once, by truck or by one drone
        for c in 1..n {
            let mut serve = LinExpr::new();
            for j in 0..n {
                if j != c {
                    serve.add(edges[c][j], 0.5);
                }
            }
            for &(_, ac, var) in &assignments {
                if ac == c {
                    serve.add(var, 1.0);
                }
            }
            engine.add_constraint(serve, Sense::Eq, 1.0, &format!("serve_{}", c));
            base_constraints += 1;
        }

        // the truck leaves and re-enters the depot
        let mut depot = LinExpr::new();
        for j in 1..n {
            depot.add(edges[0][j], 1.0);
        }
        engine.add_constraint(depot, Sense::Eq, 2.0, "deg_depot");
        base_constraints += 1;

        Ok(Formulation {
            variant: Variant::Pdstsp,
            node_count: n,
            truck_edges: edges,
            makespan: Some(makespan),
            drone_assignments: assignments,
            drone_sorties: Vec::new(),
            base_constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MicrolpEngine;
    use crate::instance::DroneParams;

    #[test]
    fn test_counts_and_fixed_out_of_range() {
        // three customers, only customer 2 within half flight time
        let mut instance = TspdInstance::from_matrix(
            "p4",
            vec![
                vec![0, 10, 1, 11],
                vec![10, 0, 10, 5],
                vec![1, 10, 0, 11],
                vec![11, 5, 11, 0],
            ],
        );
        instance.drone = Some(DroneParams::new(1.0, 4.0, 2));

        let mut engine = MicrolpEngine::new();
        let formulation = PdstspModel::new(&instance).build(&mut engine).unwrap();

        // 6 edges + 4 diagonal + T + 2 drones * 3 customers
        assert_eq!(engine.num_variables(), 6 + 4 + 1 + 6);
        // truck_time + 2 drone loads + 3 serve + depot degree
        assert_eq!(formulation.base_constraints, 1 + 2 + 3 + 1);
        assert_eq!(engine.num_constraints(), formulation.base_constraints);
        assert_eq!(formulation.drone_assignments.len(), 6);
        assert!(formulation.makespan.is_some());
    }

    #[test]
    fn test_requires_drone_parameters() {
        let instance = TspdInstance::from_matrix("p2", vec![vec![0, 1], vec![1, 0]]);
        let mut engine = MicrolpEngine::new();
        let err = PdstspModel::new(&instance).build(&mut engine).unwrap_err();
        assert!(matches!(err, SolveError::InputData(_)));
    }
}
