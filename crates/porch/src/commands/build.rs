//! Static site build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use porch_site::SiteBuilder;

use crate::config::ConfigFile;

/// Run the build command.
pub fn run(root: &Path, config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building static site...");

    let file_config = ConfigFile::load(config_path)?;

    let mut config = file_config.build_config(root);
    if let Some(output) = output {
        config.output_dir = root.join(output);
    }

    let result = SiteBuilder::new(config).build()?;

    tracing::info!(
        "Built {} pages ({} in navigation, {} static files) in {}ms",
        result.pages,
        result.nav_links,
        result.static_files,
        result.duration_ms
    );

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
