//! Immutable per-title update descriptions.

use isokeep_source::SourceDescriptor;
use isokeep_version::{FileTemplate, RenderContext, VersionStyle};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, TaskError};

/// What to do when no checksum is published for an artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecksumPolicy {
    /// Fail the task. The default; an unverifiable multi-gigabyte image
    /// is not worth committing silently.
    #[default]
    Require,
    /// Commit anyway, with a prominent warning.
    Accept,
}

/// A detached ed25519 signature over the published checksum file.
///
/// The signature file is expected to hold the 64-byte signature
/// hex-encoded; the public key is pinned in the title description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    /// Hex-encoded 32-byte verifying key.
    pub public_key_hex: String,
    /// URL of the signature file; may carry `[[VER]]`, `[[EDITION]]`,
    /// `[[ARCH]]`, `[[LANG]]`.
    pub signature_url: String,
}

/// Everything the engine knows about one managed title. Immutable;
/// per-run choices (edition, directory) come from the run configuration.
#[derive(Debug, Clone)]
pub struct TitleSpec {
    /// Canonical name, the key used in run configurations.
    pub name: String,
    /// Local filename pattern, `[[VER]]` and friends included.
    pub template: FileTemplate,
    pub source: SourceDescriptor,
    pub style: VersionStyle,
    pub checksum_policy: ChecksumPolicy,
    /// Checksum file URL when the source cannot discover one from its
    /// listing; may carry placeholders.
    pub checksum_url: Option<String>,
    pub signature: Option<SignatureSpec>,
    pub valid_editions: Vec<String>,
    pub valid_archs: Vec<String>,
    pub valid_langs: Vec<String>,
}

impl TitleSpec {
    /// Substitute the task's edition/arch/lang into every descriptor
    /// string, yielding the concrete source to resolve against.
    pub fn descriptor_for(&self, ctx: &RenderContext) -> Result<SourceDescriptor, TaskError> {
        let s = |raw: &str| substitute(raw, ctx);
        Ok(match &self.source {
            SourceDescriptor::ReleaseApi {
                repo,
                asset_pattern,
                version_from,
                version_pattern,
            } => SourceDescriptor::ReleaseApi {
                repo: s(repo)?,
                asset_pattern: s(asset_pattern)?,
                version_from: *version_from,
                version_pattern: s(version_pattern)?,
            },
            SourceDescriptor::MirrorList {
                mirrors,
                file_pattern,
                version_pattern,
                link_template,
            } => SourceDescriptor::MirrorList {
                mirrors: mirrors.iter().map(|m| s(m)).collect::<Result<_, _>>()?,
                file_pattern: s(file_pattern)?,
                version_pattern: s(version_pattern)?,
                link_template: link_template.as_deref().map(s).transpose()?,
            },
            SourceDescriptor::VendorPage { url, rule } => SourceDescriptor::VendorPage {
                url: s(url)?,
                rule: rule.clone(),
            },
        })
    }

    /// Resolve a requested edition (or arch/lang) to its canonical
    /// catalog casing, rejecting values the title does not offer. An
    /// axis with no declared values accepts anything verbatim.
    pub fn canonical_value(
        axis: &str,
        requested: &str,
        valid: &[String],
    ) -> Result<String, TaskError> {
        if valid.is_empty() {
            return Ok(requested.to_string());
        }
        valid
            .iter()
            .find(|v| v.eq_ignore_ascii_case(requested))
            .cloned()
            .ok_or_else(|| {
                TaskError::new(
                    ErrorKind::NoMatch,
                    format!(
                        "unknown {axis} {requested:?}; valid values: {}",
                        valid.join(", ")
                    ),
                )
            })
    }
}

/// Replace `[[EDITION]]`/`[[ARCH]]`/`[[LANG]]` in a descriptor string.
/// A placeholder without a supplied value is a configuration error.
pub(crate) fn substitute(raw: &str, ctx: &RenderContext) -> Result<String, TaskError> {
    let mut out = raw.to_string();
    for (marker, value) in [
        ("[[EDITION]]", ctx.edition.as_deref()),
        ("[[ARCH]]", ctx.arch.as_deref()),
        ("[[LANG]]", ctx.lang.as_deref()),
    ] {
        if !out.contains(marker) {
            continue;
        }
        let value = value.ok_or_else(|| {
            TaskError::new(
                ErrorKind::Parse,
                format!("{raw:?} needs {marker} but none was configured"),
            )
        })?;
        out = out.replace(marker, value);
    }
    Ok(out)
}
