//! Session facade: configuration, dataset, controller, and stopwatch
//! composed behind the command surface front ends consume.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::info;

use crate::engine::{ErrorFunction, Op, SearchEngine};
use crate::schema::{ConfigError, Dataset, SearchConfig, SearchConfigOverride};

use super::aggregator::GenerationAggregator;
use super::bus::{EventBus, ListenerId, SearchEvent};
use super::controller::{InvalidState, RunController, RunState, Termination};
use super::record::GenerationRecord;
use super::stopwatch::Stopwatch;

/// Errors surfaced by session commands.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    InvalidState(#[from] InvalidState),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to write predictions: {0}")]
    Predictions(#[from] csv::Error),
}

/// One search session: construct, `start()` once, observe, and let it
/// end - or pause, retune, resume, and stop it.
///
/// The session is `Paused` with a zero duration until `start()`.
pub struct SearchSession {
    config: SearchConfig,
    dataset: Arc<Dataset>,
    controller: RunController,
    stopwatch: Arc<Stopwatch>,
    bus: Arc<EventBus>,
    engine: Option<Box<dyn SearchEngine>>,
    next_unread: Mutex<usize>,
}

impl SearchSession {
    /// Validate the configuration and assemble a session around the
    /// given engine. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: SearchConfig,
        dataset: Arc<Dataset>,
        engine: Box<dyn SearchEngine>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let bus = Arc::new(EventBus::new());
        let stopwatch = Arc::new(Stopwatch::new());
        let controller = RunController::new(Arc::clone(&bus), Arc::clone(&stopwatch));

        Ok(Self {
            config,
            dataset,
            controller,
            stopwatch,
            bus,
            engine: Some(engine),
            next_unread: Mutex::new(0),
        })
    }

    pub fn state(&self) -> RunState {
        self.controller.state()
    }

    /// Why the run ended, once it has.
    pub fn termination(&self) -> Option<Termination> {
        self.controller.termination()
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Observe progress events; delivery is synchronous on the worker
    /// thread.
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&SearchEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: ListenerId) {
        self.bus.unsubscribe(id);
    }

    /// Start the background search. Fire-and-forget: progress is
    /// observed through events or by polling the generation getters.
    /// Allowed once per session.
    pub fn start(&mut self) -> Result<(), SessionError> {
        let engine = self
            .engine
            .take()
            .ok_or(InvalidState::AlreadyStarted("start"))?;

        let aggregator = GenerationAggregator::new(
            self.config.multi_objective,
            self.dataset.input_labels().to_vec(),
        );
        *self.cursor() = 0;
        self.controller.start(engine, aggregator, &self.config)?;
        self.stopwatch.start();

        info!(
            "search started: {} generations x {} candidates",
            self.config.max_generations, self.config.population_size
        );
        Ok(())
    }

    /// Pause the search at the next generation boundary and freeze the
    /// duration.
    pub fn pause(&self) -> Result<(), SessionError> {
        self.controller.pause()?;
        self.stopwatch.pause();
        Ok(())
    }

    /// Resume a paused search, handing the engine any parameters edited
    /// while paused. A resume while already Running changes nothing.
    pub fn resume(&self) -> Result<(), SessionError> {
        self.controller.queue_config(self.config.clone());
        self.controller.resume()?;
        self.stopwatch.resume();
        Ok(())
    }

    /// Stop the search for good and reap the worker.
    pub fn stop(&mut self) -> Result<(), SessionError> {
        self.controller.stop()?;
        self.stopwatch.pause();
        Ok(())
    }

    /// Block until the worker ends on its own (limits or failure).
    pub fn join(&mut self) {
        self.controller.join();
    }

    /// Total time the search has been Running; constant while paused.
    pub fn current_duration(&self) -> Duration {
        self.stopwatch.current()
    }

    /// Number of completed generations.
    pub fn generation_count(&self) -> usize {
        self.controller.generation_count()
    }

    /// Record with generation number `index` (1-based, matching
    /// [`GenerationRecord::index`]).
    pub fn generation(&self, index: u64) -> Option<Arc<GenerationRecord>> {
        if index == 0 {
            return None;
        }
        self.controller.generation((index - 1) as usize)
    }

    /// Most recently completed generation.
    pub fn latest_generation(&self) -> Option<Arc<GenerationRecord>> {
        self.controller.latest_generation()
    }

    /// Monotonic read cursor: each record is handed out exactly once, in
    /// index order; `None` until a new record arrives.
    pub fn next_unread_generation(&self) -> Option<Arc<GenerationRecord>> {
        let mut cursor = self.cursor();
        let record = self.controller.generation(*cursor)?;
        *cursor += 1;
        Some(record)
    }

    // Parameter setters: legal only while paused, each re-validated
    // before taking effect.

    pub fn set_max_generations(&mut self, value: u64) -> Result<(), SessionError> {
        self.update(|config| config.max_generations = value)
    }

    pub fn set_population_size(&mut self, value: usize) -> Result<(), SessionError> {
        self.update(|config| config.population_size = value)
    }

    pub fn set_initial_depth(&mut self, value: usize) -> Result<(), SessionError> {
        self.update(|config| config.initial_depth = value)
    }

    pub fn set_max_nodes(&mut self, value: usize) -> Result<(), SessionError> {
        self.update(|config| config.max_nodes = value)
    }

    pub fn set_operators(&mut self, value: Vec<Op>) -> Result<(), SessionError> {
        self.update(|config| config.operators = value)
    }

    pub fn set_error_function(&mut self, value: ErrorFunction) -> Result<(), SessionError> {
        self.update(|config| config.error_function = value)
    }

    pub fn set_offspring_fraction(&mut self, value: f64) -> Result<(), SessionError> {
        self.update(|config| config.offspring_fraction = value)
    }

    pub fn set_mutation_rate(&mut self, value: f64) -> Result<(), SessionError> {
        self.update(|config| config.mutation_rate = value)
    }

    pub fn set_crossover_rate(&mut self, value: f64) -> Result<(), SessionError> {
        self.update(|config| config.crossover_rate = value)
    }

    pub fn set_steady_fitness_limit(&mut self, value: Option<u64>) -> Result<(), SessionError> {
        self.update(|config| config.steady_fitness_limit = value)
    }

    pub fn set_time_limit(&mut self, value: Option<Duration>) -> Result<(), SessionError> {
        self.update(|config| config.time_limit_secs = value.map(|d| d.as_secs()))
    }

    pub fn set_seed(&mut self, value: Option<u64>) -> Result<(), SessionError> {
        self.update(|config| config.seed = value)
    }

    pub fn set_multi_objective(&mut self, value: bool) -> Result<(), SessionError> {
        self.update(|config| config.multi_objective = value)
    }

    pub fn set_skeleton(&mut self, value: Option<String>) -> Result<(), SessionError> {
        self.update(|config| config.skeleton = value)
    }

    /// Merge every populated override field, then re-validate.
    pub fn apply_override(&mut self, over: &SearchConfigOverride) -> Result<(), SessionError> {
        self.update(|config| over.apply(config))
    }

    /// Write a predictions file from the latest generation's best
    /// solution. Returns the path actually written (`.csv` is appended
    /// when missing).
    pub fn write_predictions<P: AsRef<Path>>(&self, path: P) -> Result<PathBuf, SessionError> {
        let record = self
            .latest_generation()
            .ok_or(InvalidState::NotStarted("generate predictions"))?;
        self.write_predictions_record(path.as_ref(), &record)
    }

    /// Same, using the best solution of generation `index` (1-based).
    pub fn write_predictions_for<P: AsRef<Path>>(
        &self,
        path: P,
        index: u64,
    ) -> Result<PathBuf, SessionError> {
        let record = self
            .generation(index)
            .ok_or(InvalidState::NotStarted("generate predictions"))?;
        self.write_predictions_record(path.as_ref(), &record)
    }

    fn write_predictions_record(
        &self,
        path: &Path,
        record: &GenerationRecord,
    ) -> Result<PathBuf, SessionError> {
        let mut path = path.to_path_buf();
        if path.extension().is_none_or(|extension| extension != "csv") {
            path.as_mut_os_string().push(".csv");
        }

        let mut writer = csv::Writer::from_path(&path)?;

        let mut header: Vec<String> = self.dataset.input_labels().to_vec();
        header.push(format!("ACTUAL {}", self.dataset.target_label()));
        header.push(format!(
            "PREDICTED {} = {}",
            self.dataset.target_label(),
            record.best_candidate.rendering
        ));
        writer.write_record(&header)?;

        for (inputs, target) in self.dataset.inputs().iter().zip(self.dataset.targets()) {
            let mut row: Vec<String> = inputs.iter().map(|v| v.to_string()).collect();
            row.push(target.to_string());
            row.push(record.predict(inputs).to_string());
            writer.write_record(&row)?;
        }
        writer.flush().map_err(csv::Error::from)?;

        info!("wrote predictions to {}", path.display());
        Ok(path)
    }

    fn update(&mut self, apply: impl FnOnce(&mut SearchConfig)) -> Result<(), SessionError> {
        let state = self.controller.state();
        if state != RunState::Paused {
            return Err(InvalidState::NotPaused(state).into());
        }

        let mut updated = self.config.clone();
        apply(&mut updated);
        updated.validate()?;
        self.config = updated;
        Ok(())
    }

    fn cursor(&self) -> std::sync::MutexGuard<'_, usize> {
        self.next_unread.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, Expr, Fitness, RawGeneration, SolutionCandidate};
    use std::thread;
    use std::time::Instant;
    use tempfile::tempdir;

    /// Engine producing a fixed formula with improving fitness, with
    /// configurable per-generation wall time. Applied configs are
    /// recorded for inspection.
    struct StubEngine {
        delay: Duration,
        fitness: f64,
        applied: Arc<Mutex<Vec<SearchConfig>>>,
    }

    impl StubEngine {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                fitness: 1000.0,
                applied: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn applied(&self) -> Arc<Mutex<Vec<SearchConfig>>> {
            Arc::clone(&self.applied)
        }
    }

    impl SearchEngine for StubEngine {
        fn next_generation(&mut self) -> Result<RawGeneration, EngineError> {
            thread::sleep(self.delay);
            self.fitness -= 1.0;

            // y = (x + 1)
            let expr = Expr::Call(Op::Add, vec![Expr::Var(0), Expr::Const(1.0)]);
            let candidate = SolutionCandidate::new(
                expr,
                &["x".to_string()],
                Fitness::Scalar(self.fitness),
            );
            Ok(RawGeneration {
                population: vec![candidate.clone()],
                best: candidate,
            })
        }

        fn apply_config(&mut self, config: &SearchConfig) {
            self.applied.lock().unwrap().push(config.clone());
        }
    }

    fn test_dataset() -> Arc<Dataset> {
        Arc::new(Dataset::new(
            vec!["x".to_string()],
            "y".to_string(),
            vec![vec![1.0], vec![2.0], vec![3.0]],
            vec![2.0, 3.0, 4.0],
        ))
    }

    fn session_with(max_generations: u64, delay: Duration) -> SearchSession {
        let config = SearchConfig {
            max_generations,
            ..Default::default()
        };
        SearchSession::new(config, test_dataset(), Box::new(StubEngine::new(delay))).unwrap()
    }

    fn wait_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_new_session_is_paused_with_zero_duration() {
        let session = session_with(5, Duration::ZERO);
        assert_eq!(session.state(), RunState::Paused);
        assert_eq!(session.current_duration(), Duration::ZERO);
        assert!(session.latest_generation().is_none());
    }

    #[test]
    fn test_commands_before_start_fail() {
        let mut session = session_with(5, Duration::ZERO);

        assert!(matches!(
            session.pause(),
            Err(SessionError::InvalidState(InvalidState::NotStarted(_)))
        ));
        assert!(matches!(
            session.resume(),
            Err(SessionError::InvalidState(InvalidState::NotStarted(_)))
        ));
        assert!(matches!(
            session.stop(),
            Err(SessionError::InvalidState(InvalidState::NotStarted(_)))
        ));
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let config = SearchConfig {
            mutation_rate: 2.0,
            ..Default::default()
        };
        let result = SearchSession::new(
            config,
            test_dataset(),
            Box::new(StubEngine::new(Duration::ZERO)),
        );
        assert!(matches!(result, Err(SessionError::Config(_))));
    }

    #[test]
    fn test_start_runs_and_ends() {
        let mut session = session_with(3, Duration::from_millis(1));
        session.start().unwrap();
        assert_eq!(session.state(), RunState::Running);

        session.join();
        assert_eq!(session.state(), RunState::Ended);
        assert_eq!(session.termination(), Some(Termination::MaxGenerations));
        assert_eq!(session.generation_count(), 3);

        // start() is once per session
        assert!(matches!(
            session.start(),
            Err(SessionError::InvalidState(InvalidState::AlreadyStarted(_)))
        ));
    }

    #[test]
    fn test_duration_freezes_while_paused() {
        let mut session = session_with(1_000_000, Duration::from_millis(2));
        session.start().unwrap();

        thread::sleep(Duration::from_millis(80));
        session.pause().unwrap();
        let frozen = session.current_duration();
        assert!(frozen >= Duration::from_millis(50));

        thread::sleep(Duration::from_millis(80));
        assert_eq!(session.current_duration(), frozen);

        session.resume().unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(session.current_duration() > frozen);

        session.stop().unwrap();
    }

    #[test]
    fn test_next_unread_returns_each_record_once() {
        let mut session = session_with(3, Duration::from_millis(1));
        session.start().unwrap();
        session.join();

        let indices: Vec<u64> = std::iter::from_fn(|| session.next_unread_generation())
            .map(|record| record.index)
            .collect();
        assert_eq!(indices, [1, 2, 3]);

        // consumed; nothing new arrives after the end
        assert!(session.next_unread_generation().is_none());
    }

    #[test]
    fn test_generation_lookup_is_by_index() {
        let mut session = session_with(3, Duration::from_millis(1));
        session.start().unwrap();
        session.join();

        assert!(session.generation(0).is_none());
        assert_eq!(session.generation(2).unwrap().index, 2);
        assert!(session.generation(4).is_none());
    }

    #[test]
    fn test_setters_require_paused_state() {
        let mut session = session_with(1_000_000, Duration::from_millis(1));
        session.start().unwrap();

        assert!(matches!(
            session.set_max_generations(10),
            Err(SessionError::InvalidState(InvalidState::NotPaused(
                RunState::Running
            )))
        ));

        session.pause().unwrap();
        session.set_max_generations(10).unwrap();
        session.set_mutation_rate(0.5).unwrap();
        assert_eq!(session.config().max_generations, 10);

        // invalid edits leave the config untouched
        assert!(session.set_mutation_rate(7.0).is_err());
        assert_eq!(session.config().mutation_rate, 0.5);

        session.stop().unwrap();
    }

    #[test]
    fn test_resume_pushes_edited_config_to_engine() {
        let engine = StubEngine::new(Duration::from_millis(1));
        let applied = engine.applied();
        let config = SearchConfig {
            max_generations: 1_000_000,
            ..Default::default()
        };
        let mut session =
            SearchSession::new(config, test_dataset(), Box::new(engine)).unwrap();

        session.start().unwrap();
        assert!(wait_until(|| session.generation_count() > 0, Duration::from_secs(5)));
        session.pause().unwrap();
        session.set_population_size(7).unwrap();
        session.resume().unwrap();

        assert!(wait_until(
            || applied.lock().unwrap().len() == 1,
            Duration::from_secs(5)
        ));
        assert_eq!(applied.lock().unwrap()[0].population_size, 7);

        session.stop().unwrap();
    }

    #[test]
    fn test_apply_override_checks_state_and_merges() {
        let mut session = session_with(1_000_000, Duration::from_millis(1));
        let over = SearchConfigOverride {
            max_generations: Some(9),
            ..Default::default()
        };

        session.apply_override(&over).unwrap();
        assert_eq!(session.config().max_generations, 9);

        session.start().unwrap();
        assert!(session.apply_override(&over).is_err());
        session.stop().unwrap();
    }

    #[test]
    fn test_predictions_before_any_generation_fail() {
        let session = session_with(5, Duration::ZERO);
        let dir = tempdir().unwrap();
        assert!(matches!(
            session.write_predictions(dir.path().join("out")),
            Err(SessionError::InvalidState(_))
        ));
    }

    #[test]
    fn test_predictions_file_format() {
        let dir = tempdir().unwrap();
        let mut session = session_with(2, Duration::from_millis(1));
        session.start().unwrap();
        session.join();

        // extension is appended when absent
        let path = session.write_predictions(dir.path().join("preds")).unwrap();
        assert_eq!(path.extension().unwrap(), "csv");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);

        // header: input label, actual, predicted-with-formula
        assert!(lines[0].starts_with("x,ACTUAL y,"));
        assert!(lines[0].contains("PREDICTED y = (x + 1)"));

        // the stub's formula is y = x + 1, an exact fit for the dataset
        assert_eq!(lines[1], "1,2,2");
        assert_eq!(lines[2], "2,3,3");
        assert_eq!(lines[3], "3,4,4");
    }
}
