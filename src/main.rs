//! symreg CLI - run a symbolic-regression search from a JSON
//! configuration and a CSV dataset.

use std::path::PathBuf;
use std::sync::Arc;

use symreg::engine::{Fitness, RandomSearchEngine};
use symreg::run::{SearchEvent, SearchSession};
use symreg::schema::{Dataset, SearchConfig};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() > 1 && args[1] == "--example" {
        print_example_config();
        return;
    }

    if args.len() < 3 {
        eprintln!("Usage: {} <config.json> <data.csv> [predictions.csv]", args[0]);
        eprintln!();
        eprintln!("Search for a formula fitting the dataset's last column");
        eprintln!("from its other columns.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json      Path to search configuration file");
        eprintln!("  data.csv         Dataset with a header row; the last column is the target");
        eprintln!("  predictions.csv  Optional: write best-solution predictions here");
        eprintln!();
        eprintln!("An example configuration is printed with --example.");
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);
    let data_path = PathBuf::from(&args[2]);
    let predictions_path = args.get(3).map(PathBuf::from);

    // Load configuration
    let config_str = std::fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });
    let config: SearchConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    // Load dataset; the last column is the target
    let target_column = last_column_index(&data_path);
    let dataset = Dataset::from_csv(&data_path, target_column, None).unwrap_or_else(|e| {
        eprintln!("Error loading dataset: {}", e);
        std::process::exit(1);
    });
    let dataset = Arc::new(dataset);

    println!("Symbolic Regression Search");
    println!("==========================");
    println!(
        "Dataset: {} rows, inputs [{}], target {}",
        dataset.len(),
        dataset.input_labels().join(", "),
        dataset.target_label()
    );
    println!(
        "Limits: {} generations{}{}",
        config.max_generations,
        config
            .time_limit_secs
            .map(|s| format!(", {}s time limit", s))
            .unwrap_or_default(),
        config
            .steady_fitness_limit
            .map(|n| format!(", steady fitness {}", n))
            .unwrap_or_default(),
    );
    println!();

    let engine = RandomSearchEngine::new(config.clone(), Arc::clone(&dataset));
    let mut session = SearchSession::new(config, dataset, Box::new(engine)).unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    session.subscribe(|event| match event {
        SearchEvent::Generation { index } => {
            if index % 10 == 0 {
                println!("  generation {} done", index);
            }
        }
        SearchEvent::EvolutionEnded { reason } => {
            println!("  search ended: {:?}", reason);
        }
    });

    println!("Running search...");
    session.start().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
    session.join();

    let Some(best) = session.latest_generation() else {
        eprintln!("No generations completed.");
        std::process::exit(1);
    };

    println!();
    println!("Result:");
    println!("  Generations: {}", session.generation_count());
    println!("  Time: {:.2}s", session.current_duration().as_secs_f64());
    match best.best {
        Fitness::Scalar(error) => println!("  Best fitness: {:.6}", error),
        Fitness::Vector { error, complexity } => {
            println!("  Best fitness: error={:.6}, complexity={:.3}", error, complexity)
        }
    }
    println!("  Best formula: {} = {}", session.dataset().target_label(), best.formula());

    if let Some(path) = predictions_path {
        match session.write_predictions(&path) {
            Ok(written) => println!("  Predictions written to {}", written.display()),
            Err(e) => {
                eprintln!("Error writing predictions: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// Index of the last column in the file's header row.
fn last_column_index(path: &PathBuf) -> usize {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .unwrap_or_else(|e| {
            eprintln!("Error reading dataset: {}", e);
            std::process::exit(1);
        });
    let headers = reader.headers().unwrap_or_else(|e| {
        eprintln!("Error reading dataset header: {}", e);
        std::process::exit(1);
    });
    headers.len().saturating_sub(1)
}

fn print_example_config() {
    let config = SearchConfig::default();
    println!("Example configuration (config.json):");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
}
