//! Plain-TSP formulation: one binary per unordered edge, distance
//! objective, degree-2 constraint at every vertex. Subtour elimination
//! is left to the cut loop.

use super::{edge_grid, Formulation, ModelBuilder, Variant};
use crate::engine::{LinExpr, Sense, SolverEngine};
use crate::error::SolveError;
use crate::instance::TspdInstance;

pub struct TspModel<'a> {
    instance: &'a TspdInstance,
}

impl<'a> TspModel<'a> {
    pub fn new(instance: &'a TspdInstance) -> Self {
        TspModel { instance }
    }
}

impl ModelBuilder for TspModel<'_> {
    fn build(&self, engine: &mut dyn SolverEngine) -> Result<Formulation, SolveError> {
        let n = self.instance.dimension;
        let edges = edge_grid(engine, n, |i, j| self.instance.distance(i, j) as f64);

        // every vertex has exactly two incident tour edges
        let mut base_constraints = 0;
        for i in 0..n {
            let mut degree = LinExpr::new();
            for j in 0..n {
                if j != i {
                    degree.add(edges[i][j], 1.0);
                }
            }
            engine.add_constraint(degree, Sense::Eq, 2.0, &format!("deg_{}", i));
            base_constraints += 1;
        }

        Ok(Formulation {
            variant: Variant::Tsp,
            node_count: n,
            truck_edges: edges,
            makespan: None,
            drone_assignments: Vec::new(),
            drone_sorties: Vec::new(),
            base_constraints,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MicrolpEngine;

    #[test]
    fn test_variable_and_constraint_counts() {
        let instance = TspdInstance::from_matrix(
            "t4",
            vec![
                vec![0, 1, 2, 3],
                vec![1, 0, 4, 5],
                vec![2, 4, 0, 6],
                vec![3, 5, 6, 0],
            ],
        );
        let mut engine = MicrolpEngine::new();
        let formulation = TspModel::new(&instance).build(&mut engine).unwrap();

        // 6 edge variables plus 4 fixed diagonal entries
        assert_eq!(engine.num_variables(), 10);
        assert_eq!(engine.num_constraints(), 4);
        assert_eq!(formulation.base_constraints, 4);
        assert_eq!(formulation.node_count, 4);
        // shared handles: both directions name the same variable
        assert_eq!(formulation.truck_edges[1][3], formulation.truck_edges[3][1]);
    }
}
