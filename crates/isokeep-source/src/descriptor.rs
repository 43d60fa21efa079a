//! Data-parameterized source descriptions.

use serde::{Deserialize, Serialize};

/// Where a release's version string is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseVersionFrom {
    Tag,
    Name,
    FileName,
}

/// How a vendor page yields a version and a download link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorRule {
    /// Regex over the page body: `link_pattern` captures the asset URL,
    /// `version_pattern` captures the version (from the page, falling
    /// back to the captured link).
    LinkRegex {
        link_pattern: String,
        version_pattern: Option<String>,
        /// Optional regex capturing an inline checksum published on the
        /// same page.
        checksum_pattern: Option<String>,
    },
    /// The page URL is a redirect chain; the version is read from the
    /// final URL, which is also the asset.
    RedirectTarget { version_pattern: String },
    /// The URL serves JSON; values are addressed by JSON pointer.
    Json {
        link_pointer: String,
        version_pointer: String,
        checksum_pointer: Option<String>,
    },
}

/// One upstream source. Titles differing only in URL or pattern are
/// different values of this type, not different types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceDescriptor {
    /// GitHub releases listing for `owner/repo`.
    ReleaseApi {
        repo: String,
        /// Regex an asset name must match to be a candidate.
        asset_pattern: String,
        version_from: ReleaseVersionFrom,
        /// Regex capturing the version token in the tag/name/file name.
        version_pattern: String,
    },
    /// HTML directory indexes replicated across mirrors. One mirror is
    /// chosen uniformly at random per resolution for load distribution;
    /// a failed mirror is not retried against the others within the same
    /// call.
    MirrorList {
        mirrors: Vec<String>,
        /// Regex a linked file name must match to be a candidate.
        file_pattern: String,
        /// Regex capturing the version token in a candidate link.
        version_pattern: String,
        /// Some mirrors list version directories rather than files. When
        /// set, the single candidate URL is this path (relative to the
        /// mirror) with `[[VER]]` replaced by the resolved version.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        link_template: Option<String>,
    },
    /// A vendor download page (or redirect chain).
    VendorPage { url: String, rule: VendorRule },
}

impl SourceDescriptor {
    pub fn kind(&self) -> &'static str {
        match self {
            SourceDescriptor::ReleaseApi { .. } => "release-api",
            SourceDescriptor::MirrorList { .. } => "mirror-list",
            SourceDescriptor::VendorPage { .. } => "vendor-page",
        }
    }
}
