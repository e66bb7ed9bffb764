//! Static site builder.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use chrono::Datelike;
use walkdir::WalkDir;

use crate::assets::{copy_tree, is_vanished};
use crate::nav::{build_navigation, IconMap, NavLink, Page};
use crate::templates::{SharedContext, TemplateEngine};

/// Site-wide values exposed to every template.
#[derive(Debug, Clone)]
pub struct SiteInfo {
    /// Name shown in the brand link
    pub site_name: String,

    /// Icon shown next to the site name
    pub brand_icon: String,

    /// Link target for the home/brand link
    pub home_href: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            site_name: "Home".to_string(),
            brand_icon: "🏠".to_string(),
            home_href: "index.html".to_string(),
        }
    }
}

/// Configuration for building a static site.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Page templates, scanned recursively
    pub pages_dir: PathBuf,

    /// Shared layout templates pages may extend
    pub templates_dir: PathBuf,

    /// Static assets copied verbatim, if present
    pub static_dir: PathBuf,

    /// Output directory, wiped on every build
    pub output_dir: PathBuf,

    /// Extension identifying page templates
    pub page_extension: String,

    /// Slug of the entry page left out of navigation
    pub entry_page: String,

    /// Site-wide template values
    pub site: SiteInfo,

    /// Slug to icon table for navigation labels
    pub icons: IconMap,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            pages_dir: PathBuf::from("pages"),
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
            output_dir: PathBuf::from("build"),
            page_extension: "html".to_string(),
            entry_page: "index".to_string(),
            site: SiteInfo::default(),
            icons: IconMap::default(),
        }
    }
}

impl BuildConfig {
    /// Resolve all relative directories against a project root.
    pub fn with_root(mut self, root: &Path) -> Self {
        self.pages_dir = root.join(&self.pages_dir);
        self.templates_dir = root.join(&self.templates_dir);
        self.static_dir = root.join(&self.static_dir);
        self.output_dir = root.join(&self.output_dir);
        self
    }

    /// Name of the directory static assets land in under the output root.
    pub fn static_dir_name(&self) -> String {
        self.static_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "static".to_string())
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages rendered
    pub pages: usize,

    /// Number of navigation links derived
    pub nav_links: usize,

    /// Number of static files copied
    pub static_files: usize,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing pages directory: {}", .0.display())]
    MissingPages(PathBuf),

    #[error("No pages found to render in {}", .0.display())]
    NoPages(PathBuf),

    #[error("Refusing to clean {}: it contains the pages directory", .0.display())]
    UnsafeOutput(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("Failed to render {template}: {source}")]
    Template {
        template: String,
        source: minijinja::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Static site builder.
pub struct SiteBuilder {
    config: BuildConfig,
    templates: TemplateEngine,
}

impl SiteBuilder {
    /// Create a new site builder.
    pub fn new(config: BuildConfig) -> Self {
        let templates = TemplateEngine::new(vec![
            config.templates_dir.clone(),
            config.pages_dir.clone(),
        ]);

        Self { config, templates }
    }

    /// Build the site: clean, copy static assets, then render every page.
    ///
    /// This is a full build. A failure partway through leaves the output
    /// directory incomplete; run the build again to retry.
    pub fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        self.clean_output()?;
        let static_files = self.copy_static()?;

        let pages = self.discover_pages()?;
        let nav_links = build_navigation(&pages, &self.config.entry_page, &self.config.icons);
        tracing::debug!("Derived {} navigation links", nav_links.len());

        let nav_count = nav_links.len();
        let shared = self.shared_context(nav_links);

        for page in &pages {
            self.render_page(page, &shared)?;
        }

        Ok(BuildResult {
            pages: pages.len(),
            nav_links: nav_count,
            static_files,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Discover all page templates, sorted by path.
    pub fn discover_pages(&self) -> Result<Vec<Page>, BuildError> {
        let pages_dir = &self.config.pages_dir;

        if !pages_dir.is_dir() {
            return Err(BuildError::MissingPages(pages_dir.clone()));
        }

        let mut sources = Vec::new();

        for entry in WalkDir::new(pages_dir).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if is_vanished(&e) => continue,
                Err(e) => {
                    let path = e.path().unwrap_or(pages_dir).to_path_buf();
                    return Err(BuildError::io(&path, io::Error::other(e)));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let ext = entry.path().extension().and_then(|e| e.to_str()).unwrap_or("");
            if ext == self.config.page_extension {
                sources.push(entry.into_path());
            }
        }

        if sources.is_empty() {
            return Err(BuildError::NoPages(pages_dir.clone()));
        }

        sources.sort();

        Ok(sources
            .into_iter()
            .map(|source| Page::new(pages_dir, source))
            .collect())
    }

    /// Remove any previous output and recreate the directory empty.
    fn clean_output(&self) -> Result<(), BuildError> {
        let output_dir = &self.config.output_dir;

        if resolve(&self.config.pages_dir).starts_with(resolve(output_dir)) {
            return Err(BuildError::UnsafeOutput(output_dir.clone()));
        }

        match fs::remove_dir_all(output_dir) {
            Ok(()) => tracing::debug!("Removed {}", output_dir.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(BuildError::io(output_dir, e)),
        }

        fs::create_dir_all(output_dir).map_err(|e| BuildError::io(output_dir, e))
    }

    /// Copy the static directory into the output, if it exists.
    fn copy_static(&self) -> Result<usize, BuildError> {
        if !self.config.static_dir.is_dir() {
            tracing::debug!(
                "No static directory at {}",
                self.config.static_dir.display()
            );
            return Ok(0);
        }

        let target = self.config.output_dir.join(self.config.static_dir_name());
        let copied = copy_tree(&self.config.static_dir, &target)?;
        tracing::debug!("Copied {} static files to {}", copied, target.display());

        Ok(copied)
    }

    /// Context shared by every page of this build.
    fn shared_context(&self, nav_links: Vec<NavLink>) -> SharedContext {
        SharedContext {
            nav_links,
            site_name: self.config.site.site_name.clone(),
            brand_icon: self.config.site.brand_icon.clone(),
            home_href: self.config.site.home_href.clone(),
            static_css_path: format!("{}/styles.css", self.config.static_dir_name()),
            current_year: chrono::Local::now().year(),
        }
    }

    /// Render a single page to the matching path under the output directory.
    fn render_page(&self, page: &Page, shared: &SharedContext) -> Result<(), BuildError> {
        let template = page.posix_path();

        let html = self
            .templates
            .render_page(&template, shared, &page.slug)
            .map_err(|source| BuildError::Template {
                template: template.clone(),
                source,
            })?;

        let output_path = self.config.output_dir.join(&page.relative_path);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }

        fs::write(&output_path, html).map_err(|e| BuildError::io(&output_path, e))?;
        tracing::debug!("Rendered {}", template);

        Ok(())
    }
}

/// Resolve `..` segments and symlinks, including for paths that don't exist yet.
///
/// The longest existing ancestor is canonicalized and the remaining components
/// are applied to it lexically.
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut rest = Vec::new();

    loop {
        if let Ok(mut resolved) = fs::canonicalize(existing) {
            for part in rest.iter().rev() {
                match part {
                    Component::ParentDir => {
                        resolved.pop();
                    }
                    Component::CurDir => {}
                    other => resolved.push(other),
                }
            }
            return resolved;
        }

        let Some(parent) = existing.parent() else {
            return absolute.clone();
        };
        if let Some(last) = existing.components().next_back() {
            rest.push(last);
        }
        existing = parent;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::{tempdir, TempDir};

    const BASE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>{% block title %}{{ site_name }}{% endblock %}</title>
  <link rel="stylesheet" href="{{ static_css_path }}">
</head>
<body>
  <a href="{{ home_href }}">{{ brand_icon }} {{ site_name }}</a>
  <nav>
  {% for link in nav_links %}
    <a id="{{ link.id }}" href="{{ link.href }}"{% if link.id == active_nav %} class="active"{% endif %}>{{ link.label }}</a>
  {% endfor %}
  </nav>
  {% block content %}{% endblock %}
</body>
</html>"#;

    fn site() -> TempDir {
        let temp = tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("templates")).unwrap();
        fs::create_dir_all(root.join("pages/blog")).unwrap();
        fs::create_dir_all(root.join("static/img")).unwrap();

        fs::write(root.join("templates/base.html"), BASE).unwrap();
        fs::write(
            root.join("pages/index.html"),
            r#"{% extends "base.html" %}{% block content %}<h1>Welcome</h1>{% endblock %}"#,
        )
        .unwrap();
        fs::write(
            root.join("pages/about.html"),
            r#"{% extends "base.html" %}{% block title %}About - {{ site_name }}{% endblock %}"#,
        )
        .unwrap();
        fs::write(
            root.join("pages/blog/post.html"),
            r#"{% extends "base.html" %}{% block content %}<p>Post</p>{% endblock %}"#,
        )
        .unwrap();
        fs::write(root.join("static/styles.css"), "body { margin: 0; }").unwrap();
        fs::write(root.join("static/img/logo.svg"), "<svg/>").unwrap();

        temp
    }

    fn builder(root: &Path) -> SiteBuilder {
        SiteBuilder::new(BuildConfig::default().with_root(root))
    }

    fn read_tree(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let rel = e.path().strip_prefix(dir).unwrap().to_path_buf();
                (rel, fs::read(e.path()).unwrap())
            })
            .collect()
    }

    #[test]
    fn builds_simple_site() {
        let temp = site();
        let out = temp.path().join("build");

        let result = builder(temp.path()).build().unwrap();

        assert_eq!(result.pages, 3);
        assert_eq!(result.nav_links, 2);
        assert_eq!(result.static_files, 2);
        assert!(out.join("index.html").exists());
        assert!(out.join("about.html").exists());
        assert!(out.join("blog/post.html").exists());
        assert!(out.join("static/styles.css").exists());
        assert!(out.join("static/img/logo.svg").exists());
    }

    #[test]
    fn renders_navigation_and_active_marker() {
        let temp = site();
        builder(temp.path()).build().unwrap();

        let about = fs::read_to_string(temp.path().join("build/about.html")).unwrap();
        assert!(about.contains("<title>About - Home</title>"));
        assert!(about.contains(r#"<a id="about" href="about.html" class="active">👤 About</a>"#));
        assert!(about.contains(r#"id="blog-post""#));
        assert!(about.contains(">Blog Post</a>"));
        assert!(about.contains(r#"styles.css">"#));
        assert!(!about.contains(r#"id="index""#));

        let post = fs::read_to_string(temp.path().join("build/blog/post.html")).unwrap();
        assert!(post.contains(r#"class="active">Blog Post</a>"#));
        assert!(!post.contains(r#"class="active">👤 About"#));
    }

    #[test]
    fn discovers_pages_in_sorted_order() {
        let temp = site();
        fs::write(temp.path().join("pages/notes.txt"), "not a page").unwrap();

        let pages = builder(temp.path()).discover_pages().unwrap();
        let slugs: Vec<&str> = pages.iter().map(|p| p.slug.as_str()).collect();

        assert_eq!(slugs, vec!["about", "blog-post", "index"]);
    }

    #[test]
    fn missing_pages_dir_is_an_error() {
        let temp = tempdir().unwrap();

        let err = builder(temp.path()).build().unwrap_err();

        assert!(matches!(err, BuildError::MissingPages(_)));
    }

    #[test]
    fn empty_pages_dir_is_an_error() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("pages")).unwrap();

        let err = builder(temp.path()).build().unwrap_err();

        assert!(matches!(err, BuildError::NoPages(_)));
    }

    #[test]
    fn removes_stray_output_files() {
        let temp = site();
        let out = temp.path().join("build");
        fs::create_dir_all(out.join("old")).unwrap();
        fs::write(out.join("stale.html"), "stale").unwrap();
        fs::write(out.join("old/page.html"), "stale").unwrap();

        builder(temp.path()).build().unwrap();

        assert!(!out.join("stale.html").exists());
        assert!(!out.join("old").exists());
        assert!(out.join("index.html").exists());
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let temp = site();
        let out = temp.path().join("build");

        builder(temp.path()).build().unwrap();
        let first = read_tree(&out);
        builder(temp.path()).build().unwrap();
        let second = read_tree(&out);

        assert_eq!(first, second);
    }

    #[test]
    fn builds_without_static_dir() {
        let temp = site();
        fs::remove_dir_all(temp.path().join("static")).unwrap();

        let result = builder(temp.path()).build().unwrap();

        assert_eq!(result.static_files, 0);
        assert!(!temp.path().join("build/static").exists());
    }

    #[test]
    fn refuses_output_containing_pages() {
        let temp = site();
        let config = BuildConfig {
            output_dir: PathBuf::from("."),
            ..BuildConfig::default()
        }
        .with_root(temp.path());

        let err = SiteBuilder::new(config).build().unwrap_err();

        assert!(matches!(err, BuildError::UnsafeOutput(_)));
        assert!(temp.path().join("pages/index.html").exists());
    }

    #[test]
    fn refuses_output_reaching_pages_through_parent_dir() {
        let temp = site();
        let site_name = temp.path().file_name().unwrap();
        let config = BuildConfig {
            output_dir: Path::new("..").join(site_name),
            ..BuildConfig::default()
        }
        .with_root(temp.path());

        let err = SiteBuilder::new(config).build().unwrap_err();

        assert!(matches!(err, BuildError::UnsafeOutput(_)));
        assert!(temp.path().join("pages/index.html").exists());
    }

    #[cfg(unix)]
    #[test]
    fn refuses_symlinked_output_containing_pages() {
        let temp = site();
        std::os::unix::fs::symlink(temp.path(), temp.path().join("out")).unwrap();
        let config = BuildConfig {
            output_dir: PathBuf::from("out"),
            ..BuildConfig::default()
        }
        .with_root(temp.path());

        let err = SiteBuilder::new(config).build().unwrap_err();

        assert!(matches!(err, BuildError::UnsafeOutput(_)));
        assert!(temp.path().join("pages/index.html").exists());
    }

    #[test]
    fn resolves_missing_output_with_parent_segments() {
        let temp = tempdir().unwrap();
        let base = fs::canonicalize(temp.path()).unwrap();

        assert_eq!(resolve(&temp.path().join("a/b/../c")), base.join("a/c"));
    }

    #[test]
    fn template_errors_name_the_page() {
        let temp = site();
        fs::write(temp.path().join("pages/broken.html"), "{% block %}").unwrap();

        let err = builder(temp.path()).build().unwrap_err();

        match err {
            BuildError::Template { template, .. } => assert_eq!(template, "broken.html"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
