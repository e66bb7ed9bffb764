//! Rebuild-on-change command.

use std::env;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use porch_watch::{ChangeWatcher, CommandRunner, WatchMode};

use crate::config::ConfigFile;

/// Command-line overrides for the watch settings in site.toml.
#[derive(Debug, Default)]
pub struct WatchOptions {
    pub interval_ms: Option<u64>,
    pub mode: Option<WatchMode>,
    pub build_first: bool,
}

/// Run the watch command until interrupted.
pub fn run(
    root: &Path,
    config_arg: &Path,
    config_path: &Path,
    options: WatchOptions,
) -> Result<()> {
    let file_config = ConfigFile::load(config_path)?;

    let mut config = file_config.watch_config(root)?;
    if let Some(ms) = options.interval_ms {
        config.interval = Duration::from_millis(ms);
    }
    if let Some(mode) = options.mode {
        config.mode = mode;
    }

    // Set up Ctrl+C handler
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let runner = match &file_config.watch.build_command {
        Some(command) if !command.is_empty() => CommandRunner::new(&command[0])
            .args(&command[1..])
            .current_dir(root),
        _ => {
            let exe = env::current_exe().context("Failed to locate the porch executable")?;
            CommandRunner::new(exe).args([
                OsStr::new("--root"),
                root.as_os_str(),
                OsStr::new("--config"),
                config_arg.as_os_str(),
                OsStr::new("build"),
            ])
        }
    }
    .stop_on(Arc::clone(&running));

    let mut watcher = ChangeWatcher::new(config, runner);

    if options.build_first {
        watcher.run_build();
    }

    watcher.run(&running)?;

    tracing::info!("Stopped.");

    Ok(())
}
