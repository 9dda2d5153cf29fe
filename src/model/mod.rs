//! Per-variant MIP formulations.
//!
//! Each variant implements [`ModelBuilder`]: it emits all decision
//! variables, the objective and the base (non-elimination) constraints
//! into a solver engine and returns the [`Formulation`] handle that owns
//! the variable ids for the rest of the solve. The orchestrator depends
//! only on the trait and the handle, never on a concrete variant type.

mod fstsp;
mod pdstsp;
mod tsp;

pub use fstsp::FstspModel;
pub use pdstsp::PdstspModel;
pub use tsp::TspModel;

use crate::engine::{SolverEngine, VarId, VarKind};
use crate::error::SolveError;
use crate::result::Assignment;
use crate::subtour::{activation, trace_tours};
use serde::{Deserialize, Serialize};

/// Problem variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    /// Plain traveling salesman, truck only.
    Tsp,
    /// Parallel drone scheduling: drones fly depot round trips while the
    /// truck tours the remaining customers; makespan objective.
    Pdstsp,
    /// Flying sidekick: one drone launches from and returns to truck
    /// stops; the vertex set gains a virtual return depot.
    Fstsp,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Tsp => "tsp",
            Variant::Pdstsp => "pdstsp",
            Variant::Fstsp => "fstsp",
        }
    }

    pub fn uses_drone(&self) -> bool {
        !matches!(self, Variant::Tsp)
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emits a variant's formulation into an engine.
pub trait ModelBuilder {
    fn build(&self, engine: &mut dyn SolverEngine) -> Result<Formulation, SolveError>;
}

/// Handle to the variables of one built formulation. Owned by the
/// orchestrator for the lifetime of a single solve.
#[derive(Debug, Clone)]
pub struct Formulation {
    pub variant: Variant,
    /// Vertices of the truck-edge grid; `dimension + 1` for FSTSP.
    pub node_count: usize,
    /// Shared symmetric truck-edge variables, diagonal fixed to zero.
    pub truck_edges: Vec<Vec<VarId>>,
    /// PDSTSP makespan variable.
    pub makespan: Option<VarId>,
    /// PDSTSP (drone, customer) assignment variables.
    pub drone_assignments: Vec<(usize, usize, VarId)>,
    /// FSTSP (launch, customer, recovery) sortie variables.
    pub drone_sorties: Vec<(usize, usize, usize, VarId)>,
    /// Number of base constraints contributed by the builder.
    pub base_constraints: usize,
}

impl Formulation {
    /// Read and round the truck-edge values of the current solution.
    /// The diagonal stays zero by construction.
    pub fn activation_matrix(&self, read: impl Fn(VarId) -> f64) -> Vec<Vec<u8>> {
        let n = self.node_count;
        let mut active = vec![vec![0u8; n]; n];
        for i in 0..n {
            for j in i + 1..n {
                let a = activation(read(self.truck_edges[i][j]));
                active[i][j] = a;
                active[j][i] = a;
            }
        }
        active
    }

    /// Extract the truck tours from a rounded activation matrix.
    pub fn truck_tours(&self, active: &[Vec<u8>]) -> Vec<Vec<usize>> {
        trace_tours(active)
    }

    /// Extract the variant-specific assignment from the solution.
    pub fn assignment(&self, read: impl Fn(VarId) -> f64) -> Assignment {
        match self.variant {
            Variant::Tsp => Assignment::TruckOnly,
            Variant::Pdstsp => Assignment::DroneCustomers(
                self.drone_assignments
                    .iter()
                    .filter(|(_, _, var)| activation(read(*var)) == 1)
                    .map(|&(drone, customer, _)| (drone, customer))
                    .collect(),
            ),
            Variant::Fstsp => Assignment::DroneSorties(
                self.drone_sorties
                    .iter()
                    .filter(|(_, _, _, var)| activation(read(*var)) == 1)
                    .map(|&(s, c, e, _)| (s, c, e))
                    .collect(),
            ),
        }
    }
}

/// Create the shared symmetric truck-edge grid over `node_count`
/// vertices. Off-diagonal pairs get one binary used for both
/// directions; diagonal entries are binaries fixed to zero.
pub(crate) fn edge_grid(
    engine: &mut dyn SolverEngine,
    node_count: usize,
    cost: impl Fn(usize, usize) -> f64,
) -> Vec<Vec<VarId>> {
    let mut edges = vec![vec![VarId(usize::MAX); node_count]; node_count];
    for i in 0..node_count {
        for j in i..node_count {
            let var = if i == j {
                engine.add_variable(VarKind::Binary, 0.0, 0.0, 0.0, &format!("x_{}_{}", i, i))
            } else {
                engine.add_variable(
                    VarKind::Binary,
                    0.0,
                    1.0,
                    cost(i, j),
                    &format!("x_{}_{}", i, j),
                )
            };
            edges[i][j] = var;
            edges[j][i] = var;
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_matrix_is_symmetric() {
        // a hand-built formulation over 3 vertices with edge ids 0..6
        let mut edges = vec![vec![VarId(0); 3]; 3];
        let mut next = 0;
        for i in 0..3 {
            for j in i..3 {
                edges[i][j] = VarId(next);
                edges[j][i] = VarId(next);
                next += 1;
            }
        }
        let formulation = Formulation {
            variant: Variant::Tsp,
            node_count: 3,
            truck_edges: edges,
            makespan: None,
            drone_assignments: Vec::new(),
            drone_sorties: Vec::new(),
            base_constraints: 0,
        };
        // edge (0,1) is id 1, edge (1,2) is id 4
        let active = formulation.activation_matrix(|v| match v.index() {
            1 => 0.9999,
            4 => 0.4999,
            _ => 0.0,
        });
        assert_eq!(active[0][1], 1);
        assert_eq!(active[1][0], 1);
        assert_eq!(active[1][2], 0);
        assert_eq!(active[0][0], 0);
    }
}
