//! TSP-D Solver Library
//!
//! An exact solver for the traveling salesman problem and two of its
//! drone variants, PDSTSP and FSTSP, via mixed-integer programming with
//! iteratively generated subtour-elimination cuts.
//!
//! # Features
//!
//! - TSPLIB instance loading (EUC_2D, GEO and EXPLICIT weights)
//! - Plain TSP, PDSTSP (parallel depot drones) and FSTSP (flying
//!   sidekick) formulations over shared symmetric edge variables
//! - Iterative cut loop and an equivalent lazy-constraint mode
//! - Drone sortie feasibility enumeration
//! - Warm start from an auxiliary full truck tour
//! - JSON and CSV result reporting
//!
//! # Example
//!
//! ```no_run
//! use tspd_solver::instance::TspdInstance;
//! use tspd_solver::model::Variant;
//! use tspd_solver::solver::{Solver, SolverConfig};
//!
//! let instance = TspdInstance::from_file("instance.tsp").unwrap();
//! let solver = Solver::new(&instance, SolverConfig::default());
//! let report = solver.solve(Variant::Tsp).unwrap();
//!
//! println!("Optimal: {}, objective: {:?}", report.optimal, report.objective);
//! ```

pub mod engine;
pub mod error;
pub mod feasibility;
pub mod instance;
pub mod model;
pub mod report;
pub mod result;
pub mod solver;
pub mod subtour;

pub use error::{FailureKind, SolveError};
pub use instance::TspdInstance;
pub use model::Variant;
pub use result::SolveReport;
pub use solver::{Solver, SolverConfig};
