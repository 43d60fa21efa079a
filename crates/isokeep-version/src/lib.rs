//! Version tokens and placeholder filename templates.
//!
//! Upstream sources publish versions in wildly different shapes: dotted
//! numerics (`12.7.0`), dates (`2024.08.01`), mixed alphanumerics
//! (`7.1.3-22-g2175`). [`Version`] treats them all as opaque ordered
//! tokens with a component-wise comparison rule, never as semver.
//!
//! [`FileTemplate`] is the on-disk naming convention: a filename with a
//! `[[VER]]` substitution region (plus optional `[[EDITION]]`, `[[ARCH]]`
//! and `[[LANG]]` regions). The current local version is always re-derived
//! by matching the template against the directory contents; there is no
//! separate manifest.

mod template;
mod version;

pub use template::{FileTemplate, RenderContext, TemplateError};
pub use version::{Version, VersionError, VersionStyle};
