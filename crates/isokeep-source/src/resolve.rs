//! Resolution entry point and checksum discovery.

use isokeep_fetch::HttpClient;
use isokeep_verify::ChecksumAlgo;
use isokeep_version::{Version, VersionStyle};
use tracing::debug;

use crate::candidate::Candidate;
use crate::descriptor::SourceDescriptor;
use crate::error::SourceError;
use crate::{mirror, release, vendor};

/// Checksum reference discovered next to an asset: either a value read
/// straight off a vendor page, or a companion file still to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumRef {
    Inline { algo: ChecksumAlgo, value: String },
    File { url: String, algo: ChecksumAlgo },
}

/// Outcome of version location: the latest version (when the source has
/// one), every candidate asset carrying it, and the checksum reference
/// when one was discovered.
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    pub version: Option<Version>,
    pub candidates: Vec<Candidate>,
    pub checksum: Option<ChecksumRef>,
}

/// Resolve the latest available version from an upstream source.
///
/// Network I/O only; never touches the filesystem.
pub async fn locate<C: HttpClient>(
    client: &C,
    descriptor: &SourceDescriptor,
    style: &VersionStyle,
) -> Result<ResolvedVersion, SourceError> {
    debug!(kind = descriptor.kind(), "resolving latest version");
    match descriptor {
        SourceDescriptor::ReleaseApi {
            repo,
            asset_pattern,
            version_from,
            version_pattern,
        } => {
            release::locate(
                client,
                repo,
                asset_pattern,
                *version_from,
                version_pattern,
                style,
            )
            .await
        }
        SourceDescriptor::MirrorList {
            mirrors,
            file_pattern,
            version_pattern,
            link_template,
        } => {
            mirror::locate(
                client,
                mirrors,
                file_pattern,
                version_pattern,
                link_template.as_deref(),
                style,
            )
            .await
        }
        SourceDescriptor::VendorPage { url, rule } => {
            vendor::locate(client, url, rule, style).await
        }
    }
}

/// Well-known checksum companion names, strongest digest first. Both the
/// all-caps convention (`SHA256SUMS`) and the lowercase text variants
/// are in circulation.
const CHECKSUM_FILENAMES: &[(&str, ChecksumAlgo)] = &[
    ("sha512sums", ChecksumAlgo::Sha512),
    ("sha512sum", ChecksumAlgo::Sha512),
    ("sha512sum.txt", ChecksumAlgo::Sha512),
    ("sha512sums.txt", ChecksumAlgo::Sha512),
    ("sha256sums", ChecksumAlgo::Sha256),
    ("sha256sum", ChecksumAlgo::Sha256),
    ("sha256sum.txt", ChecksumAlgo::Sha256),
    ("sha256sums.txt", ChecksumAlgo::Sha256),
    ("sha1sums", ChecksumAlgo::Sha1),
    ("sha1sum", ChecksumAlgo::Sha1),
    ("sha1sums.txt", ChecksumAlgo::Sha1),
    ("md5sums", ChecksumAlgo::Md5),
    ("md5sum", ChecksumAlgo::Md5),
    ("md5sums.txt", ChecksumAlgo::Md5),
    ("md5sum.txt", ChecksumAlgo::Md5),
];

fn rank(algo: ChecksumAlgo) -> u8 {
    match algo {
        ChecksumAlgo::Sha512 => 4,
        ChecksumAlgo::Sha256 => 3,
        ChecksumAlgo::Sha1 => 2,
        ChecksumAlgo::Md5 => 1,
    }
}

fn checksum_algo_for(name: &str) -> Option<ChecksumAlgo> {
    let lower = name.to_lowercase();
    if let Some((_, algo)) = CHECKSUM_FILENAMES.iter().find(|(n, _)| lower == *n) {
        return Some(*algo);
    }
    // Per-asset digests: `image.iso.sha256`, `image.iso.sha256sum`.
    for algo in [
        ChecksumAlgo::Sha512,
        ChecksumAlgo::Sha256,
        ChecksumAlgo::Sha1,
        ChecksumAlgo::Md5,
    ] {
        if lower.ends_with(&format!(".{}", algo.name()))
            || lower.ends_with(&format!(".{}sum", algo.name()))
        {
            return Some(algo);
        }
    }
    None
}

/// Scan a set of links for a published checksum file, preferring the
/// strongest digest on offer.
pub(crate) fn discover_checksum<'a, I>(urls: I) -> Option<ChecksumRef>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(ChecksumAlgo, String)> = None;
    for url in urls {
        let name = url.rsplit('/').next().unwrap_or(url);
        if let Some(algo) = checksum_algo_for(name) {
            let better = best
                .as_ref()
                .is_none_or(|(current, _)| rank(algo) > rank(*current));
            if better {
                best = Some((algo, url.to_string()));
            }
        }
    }
    best.map(|(algo, url)| ChecksumRef::File { url, algo })
}
