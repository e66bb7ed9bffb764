//! Running the site build as a separate process.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How often a running build is checked for exit or interruption.
const WAIT_SLICE: Duration = Duration::from_millis(20);

/// How a single build attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Build exited successfully
    Succeeded,

    /// Build exited with a failure status; `None` when killed by a signal
    Failed(Option<i32>),

    /// Build process could not be started
    SpawnFailed(String),

    /// Build was killed because the watcher is shutting down
    Interrupted,
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Something that performs one full site build.
pub trait BuildRunner {
    /// Human-readable description used in log lines.
    fn describe(&self) -> String;

    /// Run one build to completion, or until interrupted.
    fn run(&mut self) -> BuildOutcome;
}

/// Runs the build as a child process with inherited stdout/stderr.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    running: Option<Arc<AtomicBool>>,
}

impl CommandRunner {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            running: None,
        }
    }

    /// Append arguments passed to the build command.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Working directory for the build process.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Kill the build process as soon as `running` is cleared.
    pub fn stop_on(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }
}

impl BuildRunner for CommandRunner {
    fn describe(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn run(&mut self) -> BuildOutcome {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return BuildOutcome::SpawnFailed(e.to_string()),
        };

        let status = match &self.running {
            Some(running) => wait_while_running(&mut child, running),
            None => child.wait().map(Some),
        };

        match status {
            Ok(Some(status)) if status.success() => BuildOutcome::Succeeded,
            Ok(Some(status)) => BuildOutcome::Failed(status.code()),
            Ok(None) => BuildOutcome::Interrupted,
            Err(e) => {
                tracing::warn!("Lost track of build process: {}", e);
                BuildOutcome::Failed(None)
            }
        }
    }
}

/// Wait for `child` to exit, killing it if `running` is cleared first.
///
/// Returns `None` when the child was killed.
fn wait_while_running(child: &mut Child, running: &AtomicBool) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }

        if !running.load(Ordering::SeqCst) {
            // Fails only if the child already exited, which wait() reaps below
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }

        thread::sleep(WAIT_SLICE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_full_command_line() {
        let runner = CommandRunner::new("porch").args(["--root", "site", "build"]);

        assert_eq!(runner.describe(), "porch --root site build");
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let mut runner = CommandRunner::new("porch-definitely-not-installed");

        assert!(matches!(runner.run(), BuildOutcome::SpawnFailed(_)));
    }

    #[cfg(unix)]
    #[test]
    fn maps_exit_status() {
        let mut ok = CommandRunner::new("sh").args(["-c", "exit 0"]);
        let mut failing = CommandRunner::new("sh").args(["-c", "exit 3"]);

        assert_eq!(ok.run(), BuildOutcome::Succeeded);
        assert_eq!(failing.run(), BuildOutcome::Failed(Some(3)));
    }

    #[cfg(unix)]
    #[test]
    fn clearing_the_flag_kills_a_running_build() {
        let running = Arc::new(AtomicBool::new(true));
        let mut runner = CommandRunner::new("sh")
            .args(["-c", "sleep 5"])
            .stop_on(Arc::clone(&running));

        let flag = Arc::clone(&running);
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            flag.store(false, Ordering::SeqCst);
        });

        let started = std::time::Instant::now();
        let outcome = runner.run();
        stopper.join().unwrap();

        assert_eq!(outcome, BuildOutcome::Interrupted);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn build_finishing_while_running_is_not_interrupted() {
        let running = Arc::new(AtomicBool::new(true));
        let mut runner = CommandRunner::new("sh")
            .args(["-c", "exit 2"])
            .stop_on(running);

        assert_eq!(runner.run(), BuildOutcome::Failed(Some(2)));
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_configured_directory() {
        let temp = tempfile::tempdir().unwrap();
        let mut runner = CommandRunner::new("sh")
            .args(["-c", "touch built.txt"])
            .current_dir(temp.path());

        assert!(runner.run().is_success());
        assert!(temp.path().join("built.txt").exists());
    }
}
