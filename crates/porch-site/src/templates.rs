//! Template engine for rendering pages.

use std::path::PathBuf;

use minijinja::{context, path_loader, Environment, Value};
use serde::Serialize;

use crate::nav::NavLink;

/// Context shared by every page of a build.
#[derive(Debug, Clone, Serialize)]
pub struct SharedContext {
    /// Navigation links, entry page excluded
    pub nav_links: Vec<NavLink>,
    /// Site name shown in the brand link
    pub site_name: String,
    /// Icon shown next to the site name
    pub brand_icon: String,
    /// Link target of the brand/home link
    pub home_href: String,
    /// Stylesheet path relative to the output root
    pub static_css_path: String,
    /// Year the build ran in
    pub current_year: i32,
}

/// Template engine using minijinja.
///
/// Templates are resolved against each search directory in order, so pages
/// can extend layouts from the shared templates directory.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create an engine that loads templates from `search_dirs`, first match wins.
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);

        let loaders: Vec<_> = search_dirs.into_iter().map(path_loader).collect();
        env.set_loader(move |name| {
            for load in &loaders {
                if let Some(source) = load(name)? {
                    return Ok(Some(source));
                }
            }
            Ok(None)
        });

        Self { env }
    }

    /// Render a page template with the shared context plus its `active_nav` slug.
    pub fn render_page(
        &self,
        template: &str,
        shared: &SharedContext,
        active_nav: &str,
    ) -> Result<String, minijinja::Error> {
        let tmpl = self.env.get_template(template)?;

        tmpl.render(context! {
            active_nav => active_nav,
            ..Value::from_serialize(shared)
        })
    }
}
