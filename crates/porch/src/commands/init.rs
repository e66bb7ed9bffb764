//! Scaffold a new site.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

/// Files written by `porch init`, relative to the project root.
const SCAFFOLD: &[(&str, &str)] = &[
    ("templates/base.html", DEFAULT_BASE),
    ("pages/index.html", DEFAULT_INDEX),
    ("pages/about.html", DEFAULT_ABOUT),
    ("static/styles.css", DEFAULT_CSS),
];

/// Run the init command.
pub fn run(root: &Path, config_path: &Path, yes: bool) -> Result<()> {
    tracing::info!("Initializing site in {}", root.display());

    if root.join("pages").exists() && !yes {
        tracing::warn!("pages/ directory already exists. Use --yes to overwrite.");
        return Ok(());
    }

    write_file(config_path, DEFAULT_CONFIG, yes)?;

    for (relative, content) in SCAFFOLD {
        write_file(&root.join(relative), content, yes)?;
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'porch build' to render the site, or 'porch watch' to rebuild on change.");

    Ok(())
}

/// Write `content` unless the file exists and `overwrite` is off.
fn write_file(path: &Path, content: &str, overwrite: bool) -> Result<()> {
    if path.exists() && !overwrite {
        tracing::debug!("Keeping existing {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Created {}", path.display());

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Porch Configuration

[site]
site_name = "Home"
brand_icon = "🏠"
home_href = "index.html"
# Page left out of the navigation menu
entry_page = "index"

[paths]
pages = "pages"
templates = "templates"
static = "static"
output = "build"

[nav.icons]
about = "👤"
projects = "🛠️"
fun = "🎮"

[watch]
interval_ms = 1000
# "poll" or "notify"
mode = "poll"
"#;

const DEFAULT_BASE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>{% block title %}{{ site_name }}{% endblock %}</title>
  <link rel="stylesheet" href="{{ static_css_path }}">
</head>
<body>
  <nav class="navbar">
    <a class="brand{% if active_nav == 'index' %} active{% endif %}" href="{{ home_href }}">{{ brand_icon }} {{ site_name }}</a>
    <ul>
    {% for link in nav_links %}
      <li><a id="nav-{{ link.id }}" href="{{ link.href }}"{% if link.id == active_nav %} class="active"{% endif %}>{{ link.label }}</a></li>
    {% endfor %}
    </ul>
  </nav>
  <main>
    {% block content %}{% endblock %}
  </main>
  <footer>&copy; {{ current_year }} {{ site_name }}</footer>
</body>
</html>
"##;

const DEFAULT_INDEX: &str = r#"{% extends "base.html" %}
{% block title %}Home - {{ site_name }}{% endblock %}
{% block content %}
<h1>Welcome</h1>
<p>This site is built with porch. Add pages under <code>pages/</code> and they show up in the menu.</p>
{% endblock %}
"#;

const DEFAULT_ABOUT: &str = r#"{% extends "base.html" %}
{% block title %}About - {{ site_name }}{% endblock %}
{% block content %}
<h1>About</h1>
<p>Tell visitors who you are.</p>
{% endblock %}
"#;

const DEFAULT_CSS: &str = r#"* {
  box-sizing: border-box;
}

body {
  font-family: system-ui, -apple-system, sans-serif;
  line-height: 1.6;
  margin: 0;
}

.navbar {
  display: flex;
  align-items: center;
  gap: 1.5rem;
  padding: 1rem 2rem;
  border-bottom: 1px solid #ddd;
}

.navbar ul {
  display: flex;
  gap: 1rem;
  list-style: none;
  margin: 0;
  padding: 0;
}

.navbar a {
  color: inherit;
  text-decoration: none;
}

.navbar a.active {
  font-weight: 600;
  text-decoration: underline;
}

main {
  max-width: 800px;
  margin: 2rem auto;
  padding: 0 2rem;
}

footer {
  text-align: center;
  padding: 2rem;
  color: #666;
}
"#;
