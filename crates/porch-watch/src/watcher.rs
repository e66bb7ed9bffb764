//! Polling loop that rebuilds on change.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;

use crate::runner::{BuildOutcome, BuildRunner};
use crate::snapshot::Snapshot;

/// Longest uninterrupted sleep, so a cleared running flag is seen promptly.
const SLICE: Duration = Duration::from_millis(50);

/// Shortest accepted poll interval; anything lower would busy-loop.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// How the watcher decides when to take the next snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatchMode {
    /// Snapshot once per poll interval
    #[default]
    Poll,

    /// Snapshot after OS change events settle, with the poll interval as fallback
    Notify,
}

/// Configuration for the change watcher.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directories to snapshot
    pub dirs: Vec<PathBuf>,

    /// Directory names skipped while walking
    pub exclude: Vec<String>,

    /// Time between snapshots
    pub interval: Duration,

    /// Quiet period after the last change event in notify mode
    pub debounce: Duration,

    pub mode: WatchMode,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            dirs: vec![
                PathBuf::from("pages"),
                PathBuf::from("templates"),
                PathBuf::from("static"),
            ],
            exclude: vec!["build".to_string(), "__pycache__".to_string()],
            interval: Duration::from_secs(1),
            debounce: Duration::from_millis(200),
            mode: WatchMode::Poll,
        }
    }
}

/// Errors that can occur while setting up the watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("Failed to start file notifications: {0}")]
    Notify(#[from] notify::Error),
}

/// Rebuilds the site whenever a snapshot of the watched directories changes.
pub struct ChangeWatcher<R> {
    config: WatchConfig,
    runner: R,
    previous: Snapshot,
    builds: usize,
}

impl<R: BuildRunner> ChangeWatcher<R> {
    /// Create a watcher; the initial snapshot is taken immediately.
    ///
    /// An interval below [`MIN_INTERVAL`] is raised to it.
    pub fn new(mut config: WatchConfig, runner: R) -> Self {
        if config.interval < MIN_INTERVAL {
            tracing::warn!(
                "Poll interval of {}ms is too short, using {}ms",
                config.interval.as_millis(),
                MIN_INTERVAL.as_millis()
            );
            config.interval = MIN_INTERVAL;
        }

        let previous = Snapshot::capture(&config.dirs, &config.exclude);
        tracing::debug!("Initial snapshot holds {} files", previous.len());

        Self {
            config,
            runner,
            previous,
            builds: 0,
        }
    }

    /// Take a snapshot and run one build if it differs from the previous one.
    ///
    /// Returns the build outcome, or `None` when nothing changed.
    pub fn poll_once(&mut self) -> Option<BuildOutcome> {
        let current = Snapshot::capture(&self.config.dirs, &self.config.exclude);
        if current == self.previous {
            return None;
        }

        let diff = current.diff(&self.previous);
        tracing::debug!(
            "{} added, {} removed, {} modified",
            diff.added.len(),
            diff.removed.len(),
            diff.modified.len()
        );
        self.previous = current;

        Some(self.run_build())
    }

    /// Run one build and log how it went. Failures never stop the watcher.
    pub fn run_build(&mut self) -> BuildOutcome {
        tracing::info!("Running: {}", self.runner.describe());
        let outcome = self.runner.run();
        self.builds += 1;

        match &outcome {
            BuildOutcome::Succeeded => tracing::info!("Build completed."),
            BuildOutcome::Failed(Some(code)) => {
                tracing::warn!("Build failed with code {}.", code)
            }
            BuildOutcome::Failed(None) => tracing::warn!("Build terminated by signal."),
            BuildOutcome::SpawnFailed(e) => tracing::error!("Build could not start: {}", e),
            BuildOutcome::Interrupted => tracing::info!("Build interrupted."),
        }

        outcome
    }

    /// Poll until `running` is cleared.
    pub fn run(&mut self, running: &AtomicBool) -> Result<(), WatchError> {
        let waker = Waker::new(self.config.mode, &self.config.dirs)?;

        let names: Vec<String> = self
            .config
            .dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        tracing::info!("Watching {} for changes. Ctrl+C to stop.", names.join(", "));

        while running.load(Ordering::SeqCst) {
            waker.wait(self.config.interval, self.config.debounce, running);
            if !running.load(Ordering::SeqCst) {
                break;
            }
            self.poll_once();
        }

        Ok(())
    }

    /// Time between snapshots.
    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Number of builds started so far.
    pub fn builds(&self) -> usize {
        self.builds
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

/// Blocks between snapshots.
enum Waker {
    Sleep,
    Notify {
        _watcher: RecommendedWatcher,
        events: mpsc::Receiver<()>,
    },
}

impl Waker {
    fn new(mode: WatchMode, dirs: &[PathBuf]) -> Result<Self, WatchError> {
        if mode == WatchMode::Poll {
            return Ok(Self::Sleep);
        }

        let (tx, events) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if !matches!(event.kind, EventKind::Access(_)) {
                    let _ = tx.send(());
                }
            }
        })?;

        for dir in dirs {
            if dir.exists() {
                watcher.watch(dir, RecursiveMode::Recursive)?;
            }
        }

        Ok(Self::Notify {
            _watcher: watcher,
            events,
        })
    }

    fn wait(&self, interval: Duration, debounce: Duration, running: &AtomicBool) {
        let deadline = Instant::now() + interval;

        match self {
            Self::Sleep => sleep_until(deadline, running),
            Self::Notify { events, .. } => {
                while running.load(Ordering::SeqCst) {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return;
                    }

                    match events.recv_timeout(remaining.min(SLICE)) {
                        Ok(()) => {
                            settle(events, debounce, running);
                            return;
                        }
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => {
                            sleep_until(deadline, running);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Drain events until none arrive for `debounce`.
fn settle(events: &mpsc::Receiver<()>, debounce: Duration, running: &AtomicBool) {
    let mut quiet_until = Instant::now() + debounce;

    while running.load(Ordering::SeqCst) {
        let remaining = quiet_until.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }

        match events.recv_timeout(remaining.min(SLICE)) {
            Ok(()) => quiet_until = Instant::now() + debounce,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

fn sleep_until(deadline: Instant, running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return;
        }
        std::thread::sleep(remaining.min(SLICE));
    }
}
