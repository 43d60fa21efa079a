//! Placeholder filename templates.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::{Version, VersionError, VersionStyle};

pub const VER_PLACEHOLDER: &str = "[[VER]]";
pub const EDITION_PLACEHOLDER: &str = "[[EDITION]]";
pub const ARCH_PLACEHOLDER: &str = "[[ARCH]]";
pub const LANG_PLACEHOLDER: &str = "[[LANG]]";

static PLACEHOLDER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([A-Z]+)\]\]").unwrap());

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unknown placeholder [[{0}]]")]
    UnknownPlaceholder(String),
    #[error("template uses [[{placeholder}]] but no value was supplied")]
    MissingValue { placeholder: String },
    #[error("failed to build version matcher: {0}")]
    Pattern(#[from] regex::Error),
    #[error(transparent)]
    Version(#[from] VersionError),
}

/// Values substituted into a template's non-version placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub edition: Option<String>,
    pub arch: Option<String>,
    pub lang: Option<String>,
}

impl RenderContext {
    fn value_for(&self, placeholder: &str) -> Option<&str> {
        match placeholder {
            "EDITION" => self.edition.as_deref(),
            "ARCH" => self.arch.as_deref(),
            "LANG" => self.lang.as_deref(),
            _ => None,
        }
    }
}

/// A filename pattern with substitution regions.
///
/// `debian-live-[[VER]]-amd64-[[EDITION]].iso` renders to the final
/// artifact name once a version and edition are known, and turns into a
/// capture regex for re-deriving the version from what is on disk.
/// Spaces never survive rendering; vendors occasionally embed them in
/// display names and they are hostile to removable-media filesystems.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTemplate {
    raw: String,
}

impl FileTemplate {
    pub fn new(raw: impl Into<String>) -> Result<Self, TemplateError> {
        let raw = raw.into();
        for caps in PLACEHOLDER_REGEX.captures_iter(&raw) {
            let name = &caps[1];
            if !matches!(name, "VER" | "EDITION" | "ARCH" | "LANG") {
                return Err(TemplateError::UnknownPlaceholder(name.to_string()));
            }
        }
        Ok(Self { raw })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the filename embeds a version at all. Versionless titles
    /// exist (always-latest artifacts); they are re-downloaded on every
    /// run and the previous file is kept as a `.old` backup until the
    /// replacement verifies.
    pub fn has_version(&self) -> bool {
        self.raw.contains(VER_PLACEHOLDER)
    }

    pub fn has_edition(&self) -> bool {
        self.raw.contains(EDITION_PLACEHOLDER)
    }

    pub fn has_arch(&self) -> bool {
        self.raw.contains(ARCH_PLACEHOLDER)
    }

    pub fn has_lang(&self) -> bool {
        self.raw.contains(LANG_PLACEHOLDER)
    }

    /// Substitute every placeholder and strip whitespace.
    pub fn render(
        &self,
        version: Option<&Version>,
        ctx: &RenderContext,
    ) -> Result<String, TemplateError> {
        let with_ctx = self.substitute_context(ctx)?;
        let rendered = match version {
            Some(v) => with_ctx.replace(VER_PLACEHOLDER, &v.to_string()),
            None if self.has_version() => {
                return Err(TemplateError::MissingValue {
                    placeholder: "VER".to_string(),
                });
            }
            None => with_ctx,
        };
        Ok(rendered.split_whitespace().collect())
    }

    /// Build a regex matching rendered filenames, capturing the version
    /// region. The fixed prefix/suffix around `[[VER]]` are escaped
    /// literally.
    pub fn version_matcher(&self, ctx: &RenderContext) -> Result<Regex, TemplateError> {
        // Match against rendered names, which never contain whitespace.
        let with_ctx: String = self.substitute_context(ctx)?.split_whitespace().collect();
        let pattern: String = with_ctx
            .split(VER_PLACEHOLDER)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("(.+)");
        Ok(Regex::new(&format!("^{pattern}$"))?)
    }

    /// Extract the version token embedded in `filename`, if it matches
    /// this template under the given context.
    pub fn extract_version(
        &self,
        filename: &str,
        ctx: &RenderContext,
        style: &VersionStyle,
    ) -> Result<Option<Version>, TemplateError> {
        if !self.has_version() {
            return Ok(None);
        }
        let matcher = self.version_matcher(ctx)?;
        match matcher.captures(filename) {
            Some(caps) => Ok(Some(Version::parse(&caps[1], style)?)),
            None => Ok(None),
        }
    }

    fn substitute_context(&self, ctx: &RenderContext) -> Result<String, TemplateError> {
        let mut out = self.raw.clone();
        for placeholder in ["EDITION", "ARCH", "LANG"] {
            let marker = format!("[[{placeholder}]]");
            if !out.contains(&marker) {
                continue;
            }
            let value = ctx
                .value_for(placeholder)
                .ok_or_else(|| TemplateError::MissingValue {
                    placeholder: placeholder.to_string(),
                })?;
            out = out.replace(&marker, value);
        }
        Ok(out)
    }
}
