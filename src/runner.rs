//! The key loop controller.
//!
//! [`KeyRunner`] owns the run lifecycle: it validates a [`RunConfig`], spawns
//! one worker task per run, and exposes a running flag the worker polls
//! between steps. Cancellation is cooperative; after [`KeyRunner::stop`]
//! returns the worker injects at most one more key before it exits.

use crate::config::RunConfig;
use crate::error::{RuntimeError, StartError};
use crate::injector::KeyInjector;
use crate::keymap::{KeyCode, KeySymbolTable};
use crate::status::RunStatus;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, info};

/// Pause between key-down and key-up of a single press.
pub const SETTLE_DELAY: Duration = Duration::from_millis(50);

type StatusSink = Arc<dyn Fn(&RunStatus) + Send + Sync>;

/// Snapshot of the controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunState {
    pub running: bool,
    /// Index of the cycle in progress, 0 before the first one starts.
    pub cycle_index: u64,
}

/// State shared between the controller and its worker.
struct Shared {
    running: AtomicBool,
    /// Bumped by every start and stop. A worker only acts while the
    /// generation it was spawned with is still current.
    generation: AtomicU64,
    cycle: AtomicU64,
    /// Wakes a sleeping worker when the run is stopped.
    wake: Notify,
    launched: AtomicU64,
    finished: watch::Sender<u64>,
}

/// Controller for the repeating key loop.
///
/// ```no_run
/// use key_runner::{default_injector, KeyRunner, RepeatMode, RunConfig};
///
/// # async fn demo() -> anyhow::Result<()> {
/// let mut runner = KeyRunner::new(default_injector()?.into());
/// runner.on_status(|status| println!("{status}"));
///
/// let config = RunConfig::new(vec!["a".into(), "enter".into()], 0.5, RepeatMode::FixedCount(3));
/// runner.start(config)?;
/// runner.wait_idle().await;
/// # Ok(())
/// # }
/// ```
pub struct KeyRunner {
    shared: Arc<Shared>,
    table: &'static KeySymbolTable,
    injector: Arc<dyn KeyInjector>,
    sinks: Vec<StatusSink>,
    runtime: Handle,
}

impl KeyRunner {
    /// Create a runner that spawns workers on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn new(injector: Arc<dyn KeyInjector>) -> Self {
        Self::with_runtime(Handle::current(), injector)
    }

    /// Create a runner bound to an explicit runtime handle, for callers that
    /// live on a non-runtime thread such as a UI event loop.
    pub fn with_runtime(runtime: Handle, injector: Arc<dyn KeyInjector>) -> Self {
        let (finished, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                cycle: AtomicU64::new(0),
                wake: Notify::new(),
                launched: AtomicU64::new(0),
                finished,
            }),
            table: KeySymbolTable::global(),
            injector,
            sinks: Vec::new(),
            runtime,
        }
    }

    /// Register a sink for status updates.
    ///
    /// Sinks are called from the worker task. A UI that needs updates on its
    /// own thread must forward them itself. Sinks registered while a run is
    /// active take effect from the next run.
    pub fn on_status<F>(&mut self, sink: F)
    where
        F: Fn(&RunStatus) + Send + Sync + 'static,
    {
        self.sinks.push(Arc::new(sink));
    }

    /// Validate `config` and start a run in the background.
    ///
    /// Returns as soon as the worker is spawned. Nothing is injected when this
    /// returns an error.
    pub fn start(&self, config: RunConfig) -> Result<(), StartError> {
        if self.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        config.validate_with(self.table)?;

        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(StartError::AlreadyRunning);
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let run_id = self.shared.launched.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.cycle.store(0, Ordering::SeqCst);

        info!(
            run_id,
            keys = config.sequence.len(),
            delay_secs = config.inter_key_delay_secs,
            wait_secs = config.pre_start_wait_secs,
            repeat = %config.repeat,
            "starting key loop"
        );

        let worker = Worker {
            shared: self.shared.clone(),
            table: self.table,
            injector: self.injector.clone(),
            sinks: self.sinks.clone(),
            config,
            generation,
            run_id,
        };
        self.runtime.spawn(worker.run());

        Ok(())
    }

    /// Ask the active run to stop. Safe to call at any time; never blocks.
    pub fn stop(&self) {
        // Invalidate the worker before clearing the flag so a concurrent
        // start cannot be cancelled by this stop.
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if self.shared.running.swap(false, Ordering::SeqCst) {
            info!("stop requested");
        }
        self.shared.wake.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RunState {
        RunState {
            running: self.is_running(),
            cycle_index: self.shared.cycle.load(Ordering::SeqCst),
        }
    }

    /// Wait until the most recently started worker has exited.
    ///
    /// Returns immediately if nothing was ever started.
    pub async fn wait_idle(&self) {
        let target = self.shared.launched.load(Ordering::SeqCst);
        let mut finished = self.shared.finished.subscribe();
        let _ = finished.wait_for(|done| *done >= target).await;
    }
}

impl Drop for KeyRunner {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Outcome {
    Completed,
    Stopped,
}

struct Worker {
    shared: Arc<Shared>,
    table: &'static KeySymbolTable,
    injector: Arc<dyn KeyInjector>,
    sinks: Vec<StatusSink>,
    config: RunConfig,
    generation: u64,
    run_id: u64,
}

impl Worker {
    async fn run(self) {
        let mut exit = ExitGuard {
            worker: &self,
            clean: false,
        };

        let outcome = match self.play().await {
            // A stop that lands after the last key wins over completion.
            Ok(Outcome::Completed) if !self.release_run() => Ok(Outcome::Stopped),
            other => other,
        };

        match outcome {
            Ok(Outcome::Completed) => {
                info!(run_id = self.run_id, "key loop completed");
                self.emit(RunStatus::Completed);
                self.shared.running.store(false, Ordering::SeqCst);
            }
            Ok(Outcome::Stopped) if self.superseded() => {
                debug!(run_id = self.run_id, "key loop replaced by a newer run");
            }
            Ok(Outcome::Stopped) => {
                info!(run_id = self.run_id, "key loop stopped");
                self.emit(RunStatus::Stopped);
            }
            Err(e) => {
                error!(run_id = self.run_id, error = %e, "key loop aborted");
                self.fail(e.to_string());
            }
        }

        exit.clean = true;
    }

    async fn play(&self) -> Result<Outcome, RuntimeError> {
        if !self.count_down().await {
            return Ok(Outcome::Stopped);
        }

        let total = self.config.repeat.bound();
        let delay = self.config.inter_key_delay();
        let mut cycle: u64 = 0;

        loop {
            if total.is_some_and(|total| cycle >= u64::from(total)) {
                return Ok(Outcome::Completed);
            }
            if !self.is_live() {
                return Ok(Outcome::Stopped);
            }

            cycle += 1;
            self.shared.cycle.store(cycle, Ordering::SeqCst);
            self.emit(RunStatus::Cycle {
                index: cycle,
                total,
            });

            for symbol in &self.config.sequence {
                if !self.is_live() {
                    return Ok(Outcome::Stopped);
                }
                let code = self
                    .table
                    .resolve(symbol)
                    .ok_or_else(|| RuntimeError::UnresolvedSymbol(symbol.clone()))?;
                self.press(symbol, code).await?;

                if !self.pause(delay).await {
                    return Ok(Outcome::Stopped);
                }
            }
        }
    }

    /// Returns false if the run was stopped during the countdown.
    async fn count_down(&self) -> bool {
        let wait = self.config.pre_start_wait();
        let whole = wait.as_secs();

        for remaining in (1..=whole).rev() {
            if !self.is_live() {
                return false;
            }
            self.emit(RunStatus::Waiting {
                remaining_secs: remaining,
            });
            if !self.pause(Duration::from_secs(1)).await {
                return false;
            }
        }

        let rest = wait.saturating_sub(Duration::from_secs(whole));
        if rest.is_zero() {
            return self.is_live();
        }
        self.pause(rest).await
    }

    async fn press(&self, symbol: &str, code: KeyCode) -> Result<(), RuntimeError> {
        let failed = |source| RuntimeError::Injection {
            symbol: symbol.to_string(),
            source,
        };

        self.injector.inject_key(code, true).map_err(failed)?;
        tokio::time::sleep(SETTLE_DELAY).await;
        self.injector.inject_key(code, false).map_err(failed)?;

        debug!(symbol, code, "key pressed");
        Ok(())
    }

    /// Sleep for `duration`, waking early on stop. Returns whether the run is
    /// still live afterwards.
    async fn pause(&self, duration: Duration) -> bool {
        let notified = self.shared.wake.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if !self.is_live() {
            return false;
        }

        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = &mut notified => {}
        }
        self.is_live()
    }

    fn is_live(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
            && self.shared.generation.load(Ordering::SeqCst) == self.generation
    }

    /// Claim the end of this run. Fails if a stop got there first.
    fn release_run(&self) -> bool {
        self.shared
            .generation
            .compare_exchange(
                self.generation,
                self.generation + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Report a failure and end the run if this worker still owns it.
    fn fail(&self, message: String) {
        let owned = self.release_run();
        self.emit(RunStatus::Failed { message });
        if owned {
            self.shared.running.store(false, Ordering::SeqCst);
        }
    }

    /// Whether `start` has launched another run since this one.
    fn superseded(&self) -> bool {
        self.shared.launched.load(Ordering::SeqCst) != self.run_id
    }

    fn emit(&self, status: RunStatus) {
        debug!(run_id = self.run_id, %status, "status");
        for sink in &self.sinks {
            sink(&status);
        }
    }
}

/// Publishes the end of a run, including when the worker panics.
struct ExitGuard<'a> {
    worker: &'a Worker,
    clean: bool,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        let worker = self.worker;
        if !self.clean {
            error!(run_id = worker.run_id, "key loop terminated unexpectedly");
            worker.fail("key loop terminated unexpectedly".to_string());
        }

        let run_id = worker.run_id;
        worker
            .shared
            .finished
            .send_modify(|done| *done = (*done).max(run_id));
    }
}
