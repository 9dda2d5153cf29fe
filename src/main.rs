//! TSP-D Solver - Command Line Interface
//!
//! Exact solving of the TSP and its drone variants over TSPLIB files.

use clap::{Parser, Subcommand, ValueEnum};
use tspd_solver::instance::{DroneParams, TspdInstance};
use tspd_solver::model::Variant;
use tspd_solver::report::{append_csv, write_json};
use tspd_solver::solver::{Solver, SolverConfig};

use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tspd-solver")]
#[command(author = "M2 AI2D Student")]
#[command(version = "1.0")]
#[command(about = "Exact MIP solver for the TSP with drones")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve one instance to optimality
    Solve {
        /// Path to the TSPLIB instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Problem variant
        #[arg(short, long, value_enum, default_value = "tsp")]
        variant: VariantArg,

        /// Truck speed in distance units per time unit
        #[arg(long, default_value = "1.0")]
        truck_speed: f64,

        /// Drone speed in distance units per time unit
        #[arg(long, default_value = "2.0")]
        drone_speed: f64,

        /// Drone flight range in distance units
        #[arg(long, default_value = "20.0")]
        flight_range: f64,

        /// Drone fleet size (PDSTSP only)
        #[arg(long, default_value = "1")]
        drones: usize,

        /// Time limit in seconds; omit to run to optimality
        #[arg(short, long)]
        time_limit: Option<f64>,

        /// Number of engine threads (0 = automatic)
        #[arg(long, default_value = "0")]
        threads: usize,

        /// Add subtour cuts lazily inside a single optimize call
        #[arg(long)]
        lazy: bool,

        /// Skip the warm-start truck tour
        #[arg(long)]
        no_presolve: bool,

        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Append a one-row summary to a CSV log
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Verbose output
        #[arg(long)]
        verbose: bool,
    },

    /// Print statistics for an instance
    Analyze {
        /// Path to the TSPLIB instance file
        #[arg(short, long)]
        instance: PathBuf,

        /// Drone speed used for reachability statistics
        #[arg(long, default_value = "2.0")]
        drone_speed: f64,

        /// Drone flight range used for reachability statistics
        #[arg(long, default_value = "20.0")]
        flight_range: f64,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
enum VariantArg {
    /// Plain traveling salesman, truck only
    Tsp,
    /// Parallel drone scheduling TSP
    Pdstsp,
    /// Flying sidekick TSP
    Fstsp,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Tsp => Variant::Tsp,
            VariantArg::Pdstsp => Variant::Pdstsp,
            VariantArg::Fstsp => Variant::Fstsp,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Solve {
            instance,
            variant,
            truck_speed,
            drone_speed,
            flight_range,
            drones,
            time_limit,
            threads,
            lazy,
            no_presolve,
            output,
            csv,
            verbose,
        } => {
            solve_instance(
                &instance,
                variant,
                truck_speed,
                drone_speed,
                flight_range,
                drones,
                time_limit,
                threads,
                lazy,
                no_presolve,
                output,
                csv,
                verbose,
            );
        }

        Commands::Analyze { instance, drone_speed, flight_range } => {
            analyze_instance(&instance, drone_speed, flight_range);
        }
    }
}

fn load_instance(path: &PathBuf) -> TspdInstance {
    match TspdInstance::from_file(path) {
        Ok(inst) => inst,
        Err(e) => {
            eprintln!("Error loading instance: {}", e);
            std::process::exit(1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn solve_instance(
    path: &PathBuf,
    variant: VariantArg,
    truck_speed: f64,
    drone_speed: f64,
    flight_range: f64,
    drones: usize,
    time_limit: Option<f64>,
    threads: usize,
    lazy: bool,
    no_presolve: bool,
    output: Option<PathBuf>,
    csv: Option<PathBuf>,
    verbose: bool,
) {
    println!("Loading instance from {:?}...", path);
    let mut instance = load_instance(path);
    instance.truck_speed = truck_speed;
    let variant = Variant::from(variant);
    if variant.uses_drone() {
        instance.drone = Some(DroneParams::new(drone_speed, flight_range, drones));
    }

    if verbose {
        println!("{}", instance.statistics());
    }

    let config = SolverConfig { time_limit, lazy, presolve: !no_presolve, threads };
    println!("Solving {} with {} cuts...", variant, if lazy { "lazy" } else { "iterative" });

    let report = match Solver::new(&instance, config).solve(variant) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n========== Results ==========");
    println!("Instance: {}", report.name);
    println!("Variant: {}", report.variant);
    println!("Optimal: {}", report.optimal);
    match report.objective {
        Some(obj) => println!("Objective: {:.4}", obj),
        None => println!("Objective: none"),
    }
    if let Some(failure) = &report.failure {
        println!("Stopped: {}", failure);
    }
    if let Some(bound) = report.heuristic_bound {
        println!("Warm-start bound: {:.4}", bound);
    }
    println!("Iterations: {}", report.iteration_count);
    println!("Cuts added: {}", report.additional_constraint_count);
    println!(
        "Time: {:.4}s (model build {:.4}s)",
        report.total_runtime, report.model_build_runtime
    );

    if verbose {
        if let Some(last) = report.final_iteration() {
            println!("\nTruck tours: {:?}", last.truck_tours);
            println!("Assignment: {:?}", last.assignment);
        }
    }

    if let Some(out_path) = output {
        if let Err(e) = write_json(&report, &out_path) {
            eprintln!("Failed to write report: {}", e);
            std::process::exit(1);
        }
        println!("\nReport saved to {:?}", out_path);
    }

    if let Some(csv_path) = csv {
        if let Err(e) = append_csv(&report, &csv_path) {
            eprintln!("Failed to append CSV summary: {}", e);
            std::process::exit(1);
        }
        println!("Summary appended to {:?}", csv_path);
    }
}

fn analyze_instance(path: &PathBuf, drone_speed: f64, flight_range: f64) {
    let mut instance = load_instance(path);
    instance.drone = Some(DroneParams::new(drone_speed, flight_range, 1));
    println!("{}", instance.statistics());
}
