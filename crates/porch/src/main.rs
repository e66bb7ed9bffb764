//! Porch CLI - minimal template-based static site builder.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use porch_watch::WatchMode;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "porch")]
#[command(about = "Minimal template-based static site builder")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root containing pages/, templates/ and static/
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Path to site.toml, relative to the project root
    #[arg(short, long, default_value = "site.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold a new site in the project root
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Render all pages into the output directory
    Build {
        /// Output directory (defaults to config or "build")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rebuild whenever pages, templates or static files change
    Watch {
        /// Milliseconds between snapshots (at least 10)
        #[arg(long, value_parser = clap::value_parser!(u64).range(10..))]
        interval_ms: Option<u64>,

        /// How to wait between snapshots
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Run one build before watching
        #[arg(long)]
        build_first: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Poll,
    Notify,
}

impl From<ModeArg> for WatchMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Poll => WatchMode::Poll,
            ModeArg::Notify => WatchMode::Notify,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config_path = cli.root.join(&cli.config);

    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(&cli.root, &config_path, yes)?;
        }
        Commands::Build { output } => {
            commands::build::run(&cli.root, &config_path, output)?;
        }
        Commands::Watch {
            interval_ms,
            mode,
            build_first,
        } => {
            let options = commands::watch::WatchOptions {
                interval_ms,
                mode: mode.map(WatchMode::from),
                build_first,
            };
            commands::watch::run(&cli.root, &cli.config, &config_path, options)?;
        }
    }

    Ok(())
}
