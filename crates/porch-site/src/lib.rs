//! Static site builder for porch.
//!
//! Renders template-based HTML pages into a self-contained output directory,
//! copies static assets alongside them and derives the navigation menu from
//! the discovered pages.

pub mod assets;
pub mod builder;
pub mod nav;
pub mod templates;

pub use builder::{BuildConfig, BuildError, BuildResult, SiteBuilder, SiteInfo};
pub use nav::{IconMap, NavLink};
pub use templates::{SharedContext, TemplateEngine};
