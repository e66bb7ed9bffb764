//! Page metadata and navigation derivation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches the first `{% block title %}...{% endblock %}` region of a page.
static TITLE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%-?\s*block\s+title\s*-?%\}(.*?)\{%-?\s*endblock(?:\s+title)?\s*-?%\}")
        .expect("title block pattern is valid")
});

/// A page template discovered under the pages root.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Source file path
    pub source_path: PathBuf,

    /// Path relative to the pages root
    pub relative_path: PathBuf,

    /// Path-derived identifier, e.g. `blog-post`
    pub slug: String,
}

impl Page {
    /// Create a page from its source path and the pages root it lives under.
    pub fn new(pages_dir: &Path, source_path: PathBuf) -> Self {
        let relative_path = source_path
            .strip_prefix(pages_dir)
            .unwrap_or(&source_path)
            .to_path_buf();
        let slug = page_slug(&relative_path);

        Self {
            source_path,
            relative_path,
            slug,
        }
    }

    /// POSIX-style relative path, used both as template name and nav href.
    pub fn posix_path(&self) -> String {
        to_posix(&self.relative_path)
    }

    /// Whether this is the root-level entry page (e.g. `index.html`).
    pub fn is_entry(&self, entry_page: &str) -> bool {
        self.relative_path.components().count() == 1 && self.slug == entry_page
    }
}

/// A navigation link rendered into every page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavLink {
    /// Page slug, compared against `active_nav` in templates
    pub id: String,
    /// Display label, icon-prefixed when an icon is mapped
    pub label: String,
    /// Relative output path
    pub href: String,
}

/// Read-only slug to icon table used for navigation labels.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct IconMap(BTreeMap<String, String>);

impl IconMap {
    /// An empty table: no page gets an icon.
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Icon for a slug, if one is mapped.
    pub fn get(&self, slug: &str) -> Option<&str> {
        self.0
            .get(slug)
            .map(String::as_str)
            .filter(|icon| !icon.is_empty())
    }
}

impl Default for IconMap {
    fn default() -> Self {
        [("about", "👤"), ("projects", "🛠️"), ("fun", "🎮")]
            .into_iter()
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for IconMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Derive a slug from a page path relative to the pages root.
///
/// The extension is stripped and the remaining components are joined with
/// a hyphen, so `blog/post.html` becomes `blog-post`.
pub fn page_slug(relative_path: &Path) -> String {
    let stem = relative_path.with_extension("");
    stem.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("-")
}

/// Default human-readable label for a slug: `blog-post` becomes `Blog Post`.
///
/// Hyphens become spaces. A letter is upper-cased when it follows a
/// non-letter and lower-cased otherwise, so `2024recap` becomes `2024Recap`.
pub fn page_label(slug: &str) -> String {
    let mut label = String::with_capacity(slug.len());
    let mut after_letter = false;

    for c in slug.chars() {
        let c = if c == '-' { ' ' } else { c };
        if c.is_alphabetic() {
            if after_letter {
                label.extend(c.to_lowercase());
            } else {
                label.extend(c.to_uppercase());
            }
            after_letter = true;
        } else {
            label.push(c);
            after_letter = false;
        }
    }

    label
}

/// Best-effort label override taken from a page's title block.
///
/// `{% block title %}About - Home{% endblock %}` yields `About`. Returns
/// `None` when there is no title block or nothing usable precedes the dash.
pub fn extract_title_label(source: &str) -> Option<String> {
    let captures = TITLE_BLOCK.captures(source)?;
    let title = captures.get(1)?.as_str().trim();
    if title.is_empty() {
        return None;
    }

    let label = title.split('-').next().unwrap_or(title).trim();
    if label.is_empty() {
        None
    } else {
        Some(label.to_string())
    }
}

/// Build the navigation list for every page except the entry page.
///
/// Pages are expected in discovery order; the result keeps that order.
pub fn build_navigation(pages: &[Page], entry_page: &str, icons: &IconMap) -> Vec<NavLink> {
    pages
        .iter()
        .filter(|page| !page.is_entry(entry_page))
        .map(|page| {
            let label = fs::read_to_string(&page.source_path)
                .ok()
                .and_then(|source| extract_title_label(&source))
                .unwrap_or_else(|| page_label(&page.slug));

            let label = match icons.get(&page.slug) {
                Some(icon) => format!("{} {}", icon, label),
                None => label,
            };

            NavLink {
                id: page.slug.clone(),
                label,
                href: page.posix_path(),
            }
        })
        .collect()
}

/// Join path components with `/` regardless of platform.
pub(crate) fn to_posix(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
