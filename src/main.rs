//! lattice-opt CLI - Run a design optimization from JSON configuration.

use std::fs;
use std::path::PathBuf;

use lattice_opt::{
    compute::evolution::OptimizationDriver,
    schema::{DesignSpaceConfig, FitnessStatus, RunConfig, RunReport},
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [report.json]", args[0]);
        eprintln!();
        eprintln!("Run a constrained design optimization from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!("  report.json  Where to write the full run report (optional)");
        eprintln!();
        eprintln!("Example configurations are printed with --example [assembly|pin-cell|control-banks].");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config(args.get(2).map(String::as_str).unwrap_or("assembly"));
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let report_path = args.get(2).map(PathBuf::from);

    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: RunConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    print_header(&config);

    let driver = OptimizationDriver::from_config(config).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("Running search...");
    let report = driver.run().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    print_report(&report, driver.config());

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
            eprintln!("Error serializing report: {}", e);
            std::process::exit(1);
        });
        if let Err(e) = fs::write(&path, json) {
            eprintln!("Error writing report: {}", e);
            std::process::exit(1);
        }
        println!("Report written to {}", path.display());
    }
}

fn print_header(config: &RunConfig) {
    println!("Lattice Design Optimization");
    println!("===========================");
    match &config.design {
        DesignSpaceConfig::Lattice { side, symmetry } => {
            println!("Design: {side}x{side} lattice, {symmetry:?} symmetry");
        }
        DesignSpaceConfig::Continuous { variables } => {
            let names: Vec<_> = variables.iter().map(|v| v.name.as_str()).collect();
            println!("Design: continuous [{}]", names.join(", "));
        }
    }
    println!("Objective: {:?}", config.objective);
    if let Some(constraint) = &config.constraint {
        println!(
            "Constraint: at most {} cells labelled {}",
            constraint.budget, constraint.label.0
        );
    }
    println!(
        "Search: {:?}, population {}, {} generations",
        config.search.algorithm, config.search.population_size, config.search.generations
    );
    let run = &config.simulator.run;
    println!(
        "Simulator: {} particles x {} batches ({} inactive), {} threads",
        run.particles, run.batches, run.inactive, run.threads
    );
    println!();
}

fn print_report(report: &RunReport, config: &RunConfig) {
    println!();
    println!("Convergence:");
    let every = (report.history.len() / 10).max(1);
    for summary in report.history.iter() {
        if summary.generation % every == 0 || summary.generation + 1 == report.history.len() {
            println!(
                "  Generation {:>4}: best={:.5}, mean={:.5}, failed={}",
                summary.generation, summary.best.record.value, summary.mean_fitness, summary.failures
            );
        }
    }

    println!();
    println!("Best design:");
    if let DesignSpaceConfig::Lattice { side, .. } = &config.design {
        for row in report.full_vector.chunks((*side).max(1)) {
            let cells: Vec<String> = row.iter().map(|v| format!("{v:.0}")).collect();
            println!("  {}", cells.join(" "));
        }
    } else {
        println!("  {:?}", report.full_vector);
    }

    let record = &report.best.record;
    println!();
    println!("Fitness: {}", record.value);
    println!("Score: {:.5}", report.best_score);
    if let Some(m) = record.measurement {
        println!("Metric: {:.5} +/- {:.5}", m.nominal, m.std_dev);
    }
    if let Some(usage) = record.usage {
        println!(
            "Usage: {usage} ({})",
            if record.feasible { "feasible" } else { "over budget" }
        );
    }
    if let FitnessStatus::SimulationFailed { reason } = &record.status {
        println!("Every candidate failed: {reason}");
    }
    println!(
        "Time: {:.2}s ({} evaluations, seed {})",
        report.elapsed_seconds, report.evaluations, report.random_seed
    );
}

fn print_example_config(name: &str) {
    let config = match name {
        "assembly" => RunConfig::assembly_max_keff(),
        "pin-cell" => RunConfig::pin_cell_target(),
        "control-banks" => RunConfig::control_bank_critical(),
        other => {
            eprintln!("Unknown example '{other}' (expected assembly, pin-cell or control-banks)");
            std::process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing example: {}", e);
            std::process::exit(1);
        }
    }
}
