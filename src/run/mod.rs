//! Run-state control and generation aggregation for a search session.
//!
//! This module is the core of the crate: it turns an external
//! optimization engine into a cancellable, pausable background search
//! whose progress is observable generation by generation.
//!
//! # Overview
//!
//! - **[`SearchSession`]**: the command surface front ends consume -
//!   start/pause/resume/stop, duration, generation getters, parameter
//!   setters, predictions export
//! - **[`RunController`]**: the state machine and worker thread behind a
//!   session
//! - **[`GenerationAggregator`]**: raw population + fitness report in,
//!   [`GenerationRecord`] out
//! - **[`EventBus`]**: typed publish/subscribe for progress events
//! - **[`Stopwatch`]**: running-duration bookkeeping across
//!   pause/resume cycles
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use symreg::engine::RandomSearchEngine;
//! use symreg::run::{SearchEvent, SearchSession};
//! use symreg::schema::{Dataset, SearchConfig};
//!
//! let dataset = Arc::new(Dataset::from_csv("data.csv", 2, None).unwrap());
//! let config = SearchConfig::default();
//! let engine = RandomSearchEngine::new(config.clone(), Arc::clone(&dataset));
//!
//! let mut session = SearchSession::new(config, dataset, Box::new(engine)).unwrap();
//! session.subscribe(|event| {
//!     if let SearchEvent::Generation { index } = event {
//!         println!("generation {} done", index);
//!     }
//! });
//! session.start().unwrap();
//! session.join();
//!
//! let best = session.latest_generation().unwrap();
//! println!("best formula: {}", best.formula());
//! ```

mod aggregator;
mod bus;
mod controller;
mod record;
mod session;
mod stopwatch;

pub use aggregator::{COMPLEXITY_MEDIAN_SENTINEL, GenerationAggregator, pareto_front};
pub use bus::{EventBus, ListenerId, SearchEvent};
pub use controller::{InvalidState, RunController, RunState, Termination};
pub use record::GenerationRecord;
pub use session::{SearchSession, SessionError};
pub use stopwatch::Stopwatch;
