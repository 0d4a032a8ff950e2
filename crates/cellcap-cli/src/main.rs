use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use cellcap_model::{CellModel, CellOutcome, Formulation, Instance, ModelBuilder};
use cellcap_solver::{Backend, BranchAndBound, SolverConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cellcap")]
#[command(about = "Allocate integer quantities to admissible grid cells under row, column and diagonal limits", long_about = None)]
struct Cli {
    /// Log model construction and search progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct SolveArgs {
    /// Variable layout: sparse (admissible cells only) or dense (full grid)
    #[arg(short, long, default_value = "sparse")]
    formulation: Formulation,
    /// Stop the search after this many seconds
    #[arg(long)]
    time_limit: Option<f64>,
    /// Stop the search after this many branch-and-bound nodes
    #[arg(long)]
    max_nodes: Option<usize>,
    /// Write the branch-and-bound node log to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Print the outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance read from a JSON file
    Solve {
        /// The instance file
        file: PathBuf,
        #[command(flatten)]
        args: SolveArgs,
    },
    /// Solve the built-in 4x5 classroom instance
    Demo {
        #[command(flatten)]
        args: SolveArgs,
    },
    /// Solve with both formulations and compare the objective values
    Compare {
        /// The instance file
        file: PathBuf,
    },
    /// Validate an instance file
    Check {
        /// The instance file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Solve { file, args } => {
            let instance = load_instance(&file);
            run_solve(&instance, &args);
        }
        Commands::Demo { args } => {
            let instance = cellcap_model::classroom_instance();
            run_solve(&instance, &args);
        }
        Commands::Compare { file } => {
            let instance = load_instance(&file);
            let config = SolverConfig::default();
            let backend = BranchAndBound::new();

            let mut objectives = Vec::new();
            for formulation in [Formulation::Sparse, Formulation::Dense] {
                let model = build_model(&instance, formulation);
                let outcome = solve_model(&model, &backend, &config);
                println!(
                    "{:8} {:>4} variables {:>4} constraints  {:10} {}",
                    formulation.as_str(),
                    model.num_variables(),
                    model.num_constraints(),
                    outcome.status().as_str(),
                    format_objective(outcome.objective_value())
                );
                objectives.push(outcome.objective_value());
            }

            if objectives[0] == objectives[1] {
                println!("✓ formulations agree");
            } else {
                println!("✗ formulations disagree");
                std::process::exit(1);
            }
        }
        Commands::Check { file } => {
            let instance = load_instance(&file);
            match instance.validate() {
                Ok(()) => {
                    println!("✓ {} is valid", file.display());
                    println!("  {}x{} grid", instance.n_row(), instance.n_col());
                    println!("  {} admissible cells", instance.cells().len());
                    println!(
                        "  {} constraints ({} rows, {} columns, {} diagonals)",
                        instance.n_row() + instance.n_col() + instance.n_diag(),
                        instance.n_row(),
                        instance.n_col(),
                        instance.n_diag()
                    );
                    if instance.n_diag() < instance.grid_diagonals() {
                        println!(
                            "  note: grid spans {} diagonals, limits given for {}",
                            instance.grid_diagonals(),
                            instance.n_diag()
                        );
                    }
                }
                Err(e) => {
                    eprintln!("✗ {} has errors:", file.display());
                    eprintln!("  {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

fn load_instance(file: &Path) -> Instance {
    let source = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };

    match serde_json::from_str(&source) {
        Ok(instance) => instance,
        Err(e) => {
            eprintln!("Invalid instance file {}: {}", file.display(), e);
            std::process::exit(1);
        }
    }
}

fn build_model(instance: &Instance, formulation: Formulation) -> CellModel {
    match ModelBuilder::new(instance).formulation(formulation).build() {
        Ok(model) => model,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    }
}

fn solve_model(model: &CellModel, backend: &dyn Backend, config: &SolverConfig) -> CellOutcome {
    match model.solve(backend, config) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn solver_config(args: &SolveArgs) -> SolverConfig {
    let mut config = SolverConfig::default();
    if let Some(secs) = args.time_limit {
        match Duration::try_from_secs_f64(secs) {
            Ok(limit) => config = config.with_time_limit(limit),
            Err(e) => {
                eprintln!("Invalid time limit {}: {}", secs, e);
                std::process::exit(1);
            }
        }
    }
    if let Some(max) = args.max_nodes {
        config = config.with_max_nodes(max);
    }
    if let Some(path) = &args.log_file {
        config = config.with_log_path(path);
    }
    config
}

fn format_objective(value: Option<f64>) -> String {
    value.map(|v| format!("{}", v)).unwrap_or_else(|| "-".to_string())
}

fn run_solve(instance: &Instance, args: &SolveArgs) {
    let config = solver_config(args);
    let backend = BranchAndBound::new();
    let model = build_model(instance, args.formulation);
    let outcome = solve_model(&model, &backend, &config);

    if args.json {
        print_json(&model, &outcome);
    } else {
        print_report(&model, &outcome);
    }

    if matches!(outcome, CellOutcome::Infeasible) {
        std::process::exit(1);
    }
}

fn print_report(model: &CellModel, outcome: &CellOutcome) {
    println!("Model: {}", model.formulation);
    println!("Grid: {}x{} ({} diagonal limits)", model.n_row, model.n_col, model.n_diag);
    println!();
    println!("{}", "-".repeat(40));
    println!("Stats");
    println!("{}", "-".repeat(40));
    println!();
    println!("Number variables: {}", model.num_variables());
    println!("Number constraints: {}", model.num_constraints());
    println!();

    if let Some(assignment) = outcome.assignment() {
        println!("Time: {:.3} ms", assignment.stats.wall_time.as_secs_f64() * 1000.0);
        println!("CPU time: {:.3} ms", assignment.stats.cpu_time.as_secs_f64() * 1000.0);
        println!("Nodes: {}", assignment.stats.nodes);
        println!("Simplex iterations: {}", assignment.stats.lp_iterations);
        println!();
    }

    println!("Solve status: {}", outcome.status());
    println!("Objective value: {}", format_objective(outcome.objective_value()));

    match outcome {
        CellOutcome::Optimal(assignment) | CellOutcome::Feasible(assignment) => {
            if matches!(outcome, CellOutcome::Feasible(_)) {
                println!("(search limit reached, optimality not proven)");
            }
            println!();
            println!("{}", "-".repeat(40));
            println!("Variables' values");
            println!("{}", "-".repeat(40));
            println!();
            println!("{:20} value", "Admissible cell");
            for ((i, j), quantity) in assignment.iter() {
                println!("{:20} {}", format!("({}, {})", i, j), quantity);
            }
        }
        CellOutcome::Infeasible => {
            println!("No assignment satisfies all capacity limits.");
        }
    }
}

#[derive(serde::Serialize)]
struct JsonReport {
    formulation: Formulation,
    status: String,
    num_variables: usize,
    num_constraints: usize,
    objective_value: Option<f64>,
    nodes: usize,
    wall_time_ms: f64,
    cpu_time_ms: f64,
    cells: Vec<JsonCell>,
}

#[derive(serde::Serialize)]
struct JsonCell {
    row: usize,
    col: usize,
    quantity: u64,
}

fn print_json(model: &CellModel, outcome: &CellOutcome) {
    let assignment = outcome.assignment();
    let report = JsonReport {
        formulation: model.formulation,
        status: outcome.status().as_str().to_lowercase(),
        num_variables: model.num_variables(),
        num_constraints: model.num_constraints(),
        objective_value: outcome.objective_value(),
        nodes: assignment.map(|a| a.stats.nodes).unwrap_or(0),
        wall_time_ms: assignment.map(|a| a.stats.wall_time.as_secs_f64() * 1000.0).unwrap_or(0.0),
        cpu_time_ms: assignment.map(|a| a.stats.cpu_time.as_secs_f64() * 1000.0).unwrap_or(0.0),
        cells: assignment
            .map(|a| {
                a.iter()
                    .map(|((row, col), quantity)| JsonCell { row, col, quantity })
                    .collect()
            })
            .unwrap_or_default(),
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing report: {}", e);
            std::process::exit(1);
        }
    }
}
