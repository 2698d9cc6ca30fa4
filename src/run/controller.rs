//! Run-state machine and the background search worker.
//!
//! One controller owns one worker thread. The caller issues
//! start/pause/resume/stop; the worker loops over engine generations,
//! aggregates each one, and publishes progress events. Pausing blocks
//! the worker on a condition variable between generations - the only
//! suspension point - and cancellation is cooperative, observed at the
//! same generation boundary.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::SearchEngine;
use crate::schema::SearchConfig;

use super::aggregator::GenerationAggregator;
use super::bus::{EventBus, SearchEvent};
use super::record::GenerationRecord;
use super::stopwatch::Stopwatch;

/// Externally visible run state. Exactly one state holds at any time;
/// transitions happen only through controller commands and the worker's
/// own terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Initial state, and the state between `pause()` and `resume()`.
    Paused,
    /// The worker is producing generations.
    Running,
    /// Terminal: limits reached, stopped, or the engine failed.
    Ended,
}

/// Why a run reached [`RunState::Ended`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Generation limit reached.
    MaxGenerations,
    /// Running-time limit reached.
    TimeLimit,
    /// No new best for the configured number of generations.
    SteadyFitness,
    /// `stop()` was called.
    Stopped,
    /// The engine failed; the cause rides along.
    Failed(String),
}

/// A command was issued in a state that forbids it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidState {
    #[error("cannot {0}: the search has not been started")]
    NotStarted(&'static str),
    #[error("cannot {0}: the search has already been started")]
    AlreadyStarted(&'static str),
    #[error("cannot {0}: the search has ended")]
    Ended(&'static str),
    #[error("parameters can only be changed while paused (current state: {0:?})")]
    NotPaused(RunState),
}

/// How long `stop()` waits for the worker before detaching it.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Limits enforced at generation boundaries.
struct Limits {
    max_generations: u64,
    time_limit: Option<Duration>,
    steady_fitness: Option<u64>,
}

impl Limits {
    fn from_config(config: &SearchConfig) -> Self {
        Self {
            max_generations: config.max_generations,
            time_limit: config.time_limit(),
            steady_fitness: config.steady_fitness_limit,
        }
    }
}

/// Mutable control block; one mutex guards every state transition so a
/// `stop()` can never race the worker's own terminal transition.
struct Control {
    run_state: RunState,
    started: bool,
    paused: bool,
    cancelled: bool,
    termination: Option<Termination>,
    pending_config: Option<SearchConfig>,
}

struct Shared {
    control: Mutex<Control>,
    pause_cond: Condvar,
    generations: RwLock<Vec<Arc<GenerationRecord>>>,
    bus: Arc<EventBus>,
    stopwatch: Arc<Stopwatch>,
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The worker's sole suspension point: block while paused, wake on
    /// resume or stop. Returns true when cancellation was requested.
    fn wait_if_paused(&self) -> bool {
        let mut control = self.control();
        while control.paused && !control.cancelled {
            control = self
                .pause_cond
                .wait(control)
                .unwrap_or_else(PoisonError::into_inner);
        }
        control.cancelled
    }

    fn take_pending_config(&self) -> Option<SearchConfig> {
        self.control().pending_config.take()
    }

    fn generation_count(&self) -> usize {
        self.generations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn push_record(&self, record: Arc<GenerationRecord>) {
        self.generations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}

/// Owns the background worker and the append-only generation sequence.
pub struct RunController {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl RunController {
    pub fn new(bus: Arc<EventBus>, stopwatch: Arc<Stopwatch>) -> Self {
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    run_state: RunState::Paused,
                    started: false,
                    paused: false,
                    cancelled: false,
                    termination: None,
                    pending_config: None,
                }),
                pause_cond: Condvar::new(),
                generations: RwLock::new(Vec::new()),
                bus,
                stopwatch,
            }),
            worker: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.shared.control().run_state
    }

    /// Why the run ended, once it has.
    pub fn termination(&self) -> Option<Termination> {
        self.shared.control().termination.clone()
    }

    /// Number of completed generations.
    pub fn generation_count(&self) -> usize {
        self.shared.generation_count()
    }

    /// Record at `position` in completion order (0-based).
    pub fn generation(&self, position: usize) -> Option<Arc<GenerationRecord>> {
        self.shared
            .generations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(position)
            .cloned()
    }

    /// Most recently completed generation.
    pub fn latest_generation(&self) -> Option<Arc<GenerationRecord>> {
        self.shared
            .generations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Spawn the background worker. Allowed exactly once per controller;
    /// a fresh run requires a fresh session.
    pub fn start(
        &mut self,
        engine: Box<dyn SearchEngine>,
        aggregator: GenerationAggregator,
        config: &SearchConfig,
    ) -> Result<(), InvalidState> {
        {
            let mut control = self.shared.control();
            if control.started {
                return Err(InvalidState::AlreadyStarted("start"));
            }
            control.started = true;
            control.run_state = RunState::Running;
            control.paused = false;
            control.cancelled = false;
            control.termination = None;
        }
        self.shared
            .generations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let shared = Arc::clone(&self.shared);
        let limits = Limits::from_config(config);
        let handle = thread::Builder::new()
            .name("symreg-worker".to_string())
            .spawn(move || worker_loop(shared, engine, aggregator, limits))
            .expect("failed to spawn search worker");
        self.worker = Some(handle);

        info!("search worker started");
        Ok(())
    }

    /// Running -> Paused. The worker blocks at the next generation
    /// boundary.
    pub fn pause(&self) -> Result<(), InvalidState> {
        let mut control = self.shared.control();
        if control.run_state == RunState::Ended {
            return Err(InvalidState::Ended("pause"));
        }
        if !control.started {
            return Err(InvalidState::NotStarted("pause"));
        }
        control.paused = true;
        control.run_state = RunState::Paused;
        debug!("search paused");
        Ok(())
    }

    /// Paused -> Running. A resume while already Running is a no-op.
    pub fn resume(&self) -> Result<(), InvalidState> {
        let mut control = self.shared.control();
        if control.run_state == RunState::Ended {
            return Err(InvalidState::Ended("resume"));
        }
        if !control.started {
            return Err(InvalidState::NotStarted("resume"));
        }
        if control.run_state == RunState::Paused {
            control.run_state = RunState::Running;
            control.paused = false;
            self.shared.pause_cond.notify_all();
            debug!("search resumed");
        }
        Ok(())
    }

    /// Hand the worker a config to adopt at its next generation boundary.
    pub fn queue_config(&self, config: SearchConfig) {
        self.shared.control().pending_config = Some(config);
    }

    /// Request cancellation, wake a paused worker, and reap it with a
    /// best-effort bound. Idempotent after the run has ended.
    pub fn stop(&mut self) -> Result<(), InvalidState> {
        {
            let mut control = self.shared.control();
            if !control.started {
                return Err(InvalidState::NotStarted("stop"));
            }
            if control.run_state != RunState::Ended {
                control.run_state = RunState::Ended;
                control.termination.get_or_insert(Termination::Stopped);
            }
            control.cancelled = true;
            control.paused = false;
            self.shared.pause_cond.notify_all();
        }

        let Some(handle) = self.worker.take() else {
            return Ok(());
        };
        let deadline = Instant::now() + STOP_JOIN_TIMEOUT;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if handle.is_finished() {
            let _ = handle.join();
        } else {
            warn!(
                "search worker did not exit within {:?}; detaching",
                STOP_JOIN_TIMEOUT
            );
        }
        Ok(())
    }

    /// Block until the worker ends on its own.
    pub fn join(&mut self) {
        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    shared: Arc<Shared>,
    mut engine: Box<dyn SearchEngine>,
    mut aggregator: GenerationAggregator,
    mut limits: Limits,
) {
    let mut stagnation: u64 = 0;

    let reason = loop {
        if shared.wait_if_paused() {
            // stop() already recorded the termination reason
            break None;
        }

        // Adopt parameters edited while paused.
        if let Some(config) = shared.take_pending_config() {
            limits = Limits::from_config(&config);
            engine.apply_config(&config);
        }

        if shared.generation_count() as u64 >= limits.max_generations {
            break Some(Termination::MaxGenerations);
        }
        if let Some(limit) = limits.time_limit
            && shared.stopwatch.current() >= limit
        {
            break Some(Termination::TimeLimit);
        }

        let raw = match engine.next_generation() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("{e}");
                break Some(Termination::Failed(e.to_string()));
            }
        };

        let record = Arc::new(aggregator.aggregate(raw));
        let index = record.index;
        if record.is_new_best {
            stagnation = 0;
        } else {
            stagnation += 1;
        }
        shared.push_record(record);
        shared.bus.publish(&SearchEvent::Generation { index });

        if let Some(limit) = limits.steady_fitness
            && stagnation >= limit
        {
            break Some(Termination::SteadyFitness);
        }
    };

    finish(&shared, reason);
}

/// The single authoritative terminal transition. Holds the same lock as
/// pause/stop, keeps whichever termination reason was recorded first,
/// freezes the stopwatch, and publishes the end event.
fn finish(shared: &Shared, worker_reason: Option<Termination>) {
    let reason = {
        let mut control = shared.control();
        control.run_state = RunState::Ended;
        let reason = control
            .termination
            .clone()
            .or(worker_reason)
            .unwrap_or(Termination::Stopped);
        control.termination = Some(reason.clone());
        reason
    };

    shared.stopwatch.pause();
    info!("search ended: {reason:?}");
    shared.bus.publish(&SearchEvent::EvolutionEnded { reason });
}
