//! Configuration file structure (site.toml).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use porch_site::{BuildConfig, IconMap, SiteInfo};
use porch_watch::{WatchConfig, WatchMode, MIN_INTERVAL};
use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    pub site: SiteSection,
    pub paths: PathsSection,
    pub nav: NavSection,
    pub watch: WatchSection,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub site_name: String,
    pub brand_icon: String,
    pub home_href: String,
    /// Slug of the page kept out of navigation
    pub entry_page: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        let site = SiteInfo::default();
        Self {
            site_name: site.site_name,
            brand_icon: site.brand_icon,
            home_href: site.home_href,
            entry_page: "index".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub pages: PathBuf,
    pub templates: PathBuf,
    #[serde(rename = "static")]
    pub static_dir: PathBuf,
    pub output: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        let build = BuildConfig::default();
        Self {
            pages: build.pages_dir,
            templates: build.templates_dir,
            static_dir: build.static_dir,
            output: build.output_dir,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct NavSection {
    /// Slug to icon table, replaces the built-in one when given
    pub icons: IconMap,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Watched directories; defaults to the pages, templates and static paths
    pub dirs: Option<Vec<PathBuf>>,
    pub exclude: Vec<String>,
    pub interval_ms: u64,
    pub debounce_ms: u64,
    pub mode: WatchMode,
    /// Command run on change instead of `porch build`
    pub build_command: Option<Vec<String>>,
}

impl Default for WatchSection {
    fn default() -> Self {
        let watch = WatchConfig::default();
        Self {
            dirs: None,
            exclude: watch.exclude,
            interval_ms: watch.interval.as_millis() as u64,
            debounce_ms: watch.debounce.as_millis() as u64,
            mode: watch.mode,
            build_command: None,
        }
    }
}

impl ConfigFile {
    /// Load configuration if the file exists.
    /// Returns an error if the config file exists but is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Builder configuration with paths resolved against `root`.
    pub fn build_config(&self, root: &Path) -> BuildConfig {
        BuildConfig {
            pages_dir: self.paths.pages.clone(),
            templates_dir: self.paths.templates.clone(),
            static_dir: self.paths.static_dir.clone(),
            output_dir: self.paths.output.clone(),
            entry_page: self.site.entry_page.clone(),
            site: SiteInfo {
                site_name: self.site.site_name.clone(),
                brand_icon: self.site.brand_icon.clone(),
                home_href: self.site.home_href.clone(),
            },
            icons: self.nav.icons.clone(),
            ..BuildConfig::default()
        }
        .with_root(root)
    }

    /// Watcher configuration with paths resolved against `root`.
    pub fn watch_config(&self, root: &Path) -> Result<WatchConfig> {
        let interval = Duration::from_millis(self.watch.interval_ms);
        if interval < MIN_INTERVAL {
            bail!(
                "[watch] interval_ms must be at least {}, got {}",
                MIN_INTERVAL.as_millis(),
                self.watch.interval_ms
            );
        }

        let dirs = self.watch.dirs.clone().unwrap_or_else(|| {
            vec![
                self.paths.pages.clone(),
                self.paths.templates.clone(),
                self.paths.static_dir.clone(),
            ]
        });

        Ok(WatchConfig {
            dirs: dirs.iter().map(|d| root.join(d)).collect(),
            exclude: self.watch.exclude.clone(),
            interval,
            debounce: Duration::from_millis(self.watch.debounce_ms),
            mode: self.watch.mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_uses_defaults() {
        let config = ConfigFile::parse("").unwrap();
        let build = config.build_config(Path::new("/site"));

        assert_eq!(build.pages_dir, PathBuf::from("/site/pages"));
        assert_eq!(build.templates_dir, PathBuf::from("/site/templates"));
        assert_eq!(build.static_dir, PathBuf::from("/site/static"));
        assert_eq!(build.output_dir, PathBuf::from("/site/build"));
        assert_eq!(build.site.site_name, "Home");
        assert_eq!(build.entry_page, "index");
        assert_eq!(build.icons.get("about"), Some("👤"));
    }

    #[test]
    fn watch_dirs_follow_paths_section() {
        let config = ConfigFile::parse(
            r#"
[paths]
pages = "content"

[watch]
interval_ms = 250
mode = "notify"
"#,
        )
        .unwrap();

        let watch = config.watch_config(Path::new("/site")).unwrap();

        assert_eq!(
            watch.dirs,
            vec![
                PathBuf::from("/site/content"),
                PathBuf::from("/site/templates"),
                PathBuf::from("/site/static"),
            ]
        );
        assert_eq!(watch.interval, Duration::from_millis(250));
        assert_eq!(watch.mode, WatchMode::Notify);
        assert_eq!(watch.exclude, vec!["build", "__pycache__"]);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = ConfigFile::parse("[watch]\ninterval_ms = 0\n").unwrap();

        let err = config.watch_config(Path::new("/site")).unwrap_err();

        assert!(err.to_string().contains("interval_ms"));
    }

    #[test]
    fn icons_table_replaces_defaults() {
        let config = ConfigFile::parse(
            r#"
[site]
site_name = "Jo's Corner"

[nav.icons]
blog-post = "📝"
"#,
        )
        .unwrap();

        let build = config.build_config(Path::new("."));

        assert_eq!(build.site.site_name, "Jo's Corner");
        assert_eq!(build.icons.get("blog-post"), Some("📝"));
        assert_eq!(build.icons.get("about"), None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(ConfigFile::parse("[site\nsite_name = 1").is_err());
    }

    #[test]
    fn missing_file_loads_defaults() {
        let temp = tempfile::tempdir().unwrap();

        let config = ConfigFile::load(&temp.path().join("site.toml")).unwrap();

        assert_eq!(config.watch.interval_ms, 1000);
        assert!(config.watch.build_command.is_none());
    }
}
