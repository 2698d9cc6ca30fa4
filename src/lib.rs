//! symreg - pausable symbolic-regression search.
//!
//! This crate runs a long-lived stochastic search for formulas fitting a
//! dataset as a cancellable, pausable background task, and exposes its
//! progress generation by generation to any number of observers.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: typed configuration and dataset ingestion
//! - `engine`: the optimization-engine interface (expression trees,
//!   fitness shapes, the `SearchEngine` trait) plus a reference engine
//! - `run`: the session core - run-state controller, per-generation
//!   statistics aggregation, event bus, and duration stopwatch
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use symreg::{Dataset, RandomSearchEngine, SearchConfig, SearchSession};
//!
//! // Load data and configure the search
//! let dataset = Arc::new(Dataset::from_csv("data.csv", 2, None).unwrap());
//! let config = SearchConfig {
//!     max_generations: 50,
//!     seed: Some(42),
//!     ..Default::default()
//! };
//!
//! // Assemble a session around the reference engine and run it
//! let engine = RandomSearchEngine::new(config.clone(), Arc::clone(&dataset));
//! let mut session = SearchSession::new(config, dataset, Box::new(engine)).unwrap();
//! session.start().unwrap();
//! session.join();
//!
//! let best = session.latest_generation().unwrap();
//! println!("best formula after {:?}: {}", session.current_duration(), best.formula());
//! ```

pub mod engine;
pub mod run;
pub mod schema;

// Re-export commonly used types
pub use engine::{Fitness, RandomSearchEngine, SearchEngine, SolutionCandidate};
pub use run::{GenerationRecord, RunState, SearchEvent, SearchSession, Termination};
pub use schema::{Dataset, SearchConfig};
