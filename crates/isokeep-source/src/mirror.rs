//! Mirror directory-listing locator.

use isokeep_fetch::HttpClient;
use isokeep_version::{Version, VersionStyle};
use once_cell::sync::Lazy;
use rand::seq::IndexedRandom;
use regex::Regex;
use tracing::debug;

use crate::candidate::Candidate;
use crate::error::SourceError;
use crate::resolve::{discover_checksum, ResolvedVersion};

static HREF_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href=["']([^"']+)["']"#).unwrap());

/// Resolve a link found in an index page against the page's URL.
/// Query-string and fragment links are navigation noise, not files.
pub(crate) fn join_link(base: &str, link: &str) -> Option<String> {
    if link.starts_with('?') || link.starts_with('#') {
        return None;
    }
    if link.starts_with("http://") || link.starts_with("https://") {
        return Some(link.to_string());
    }
    if let Some(rest) = link.strip_prefix('/') {
        let origin_end = base.find("://").map(|i| i + 3)?;
        let origin = match base[origin_end..].find('/') {
            Some(i) => &base[..origin_end + i],
            None => base,
        };
        return Some(format!("{origin}/{rest}"));
    }
    Some(format!("{}/{}", base.trim_end_matches('/'), link))
}

fn extract_links(base: &str, html: &str) -> Vec<String> {
    HREF_REGEX
        .captures_iter(html)
        .filter_map(|caps| join_link(base, &caps[1]))
        .collect()
}

/// Resolve the latest version offered by a mirrored directory index.
///
/// One mirror is chosen uniformly at random per call; load distribution,
/// not failover. An unreachable mirror fails this resolution, and the
/// next run may well pick a different one.
pub(crate) async fn locate<C: HttpClient>(
    client: &C,
    mirrors: &[String],
    file_pattern: &str,
    version_pattern: &str,
    link_template: Option<&str>,
    style: &VersionStyle,
) -> Result<ResolvedVersion, SourceError> {
    let mirror = mirrors
        .choose(&mut rand::rng())
        .ok_or(SourceError::NoMirrors)?;
    debug!(mirror, "fetching directory index");

    let file_re = Regex::new(file_pattern).map_err(|source| SourceError::BadPattern {
        pattern: file_pattern.to_string(),
        source,
    })?;
    let version_re = Regex::new(version_pattern).map_err(|source| SourceError::BadPattern {
        pattern: version_pattern.to_string(),
        source,
    })?;

    let html = client.get_text(mirror).await?;
    let links = extract_links(mirror, &html);

    let files: Vec<&String> = links.iter().filter(|l| file_re.is_match(l)).collect();
    if files.is_empty() {
        return Err(SourceError::NotFound {
            location: mirror.clone(),
            pattern: file_pattern.to_string(),
        });
    }

    // Greatest version among the matching links wins.
    let mut latest: Option<Version> = None;
    for link in &files {
        let Some(caps) = version_re.captures(link) else {
            continue;
        };
        let raw = match caps.get(1) {
            Some(m) => m.as_str(),
            None => &caps[0],
        };
        match Version::parse(raw, style) {
            Ok(v) => {
                if latest.as_ref().is_none_or(|best| v > *best) {
                    latest = Some(v);
                }
            }
            Err(e) => debug!(link, error = %e, "skipping unparsable version"),
        }
    }
    let version = latest.ok_or_else(|| {
        SourceError::parse(
            "version",
            mirror,
            format!("pattern {version_pattern:?} captured no parsable version"),
        )
    })?;

    let version_str = version.to_string();
    let candidates: Vec<Candidate> = match link_template {
        // Listing of version directories: the download URL is built from
        // the resolved version, not read off the page.
        Some(template) => {
            let rendered = template.replace("[[VER]]", &version_str);
            let url = join_link(mirror, &rendered).ok_or_else(|| {
                SourceError::parse(
                    "download link",
                    mirror,
                    format!("unusable link template {template:?}"),
                )
            })?;
            let mut c = Candidate::new(url);
            c.version = Some(version.clone());
            vec![c]
        }
        None => files
            .iter()
            .filter(|l| l.contains(&version_str))
            .map(|l| {
                let mut c = Candidate::new((*l).clone());
                c.version = Some(version.clone());
                c
            })
            .collect(),
    };

    // Prefer a checksum published beside this version's files, then fall
    // back to a listing-wide one.
    let checksum = discover_checksum(
        links
            .iter()
            .filter(|l| l.contains(&version_str))
            .map(String::as_str),
    )
    .or_else(|| discover_checksum(links.iter().map(String::as_str)));

    Ok(ResolvedVersion {
        version: Some(version),
        candidates,
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeClient;

    const INDEX: &str = r#"
<html><body>
<a href="?C=N;O=D">Name</a>
<a href="/parent/">Parent Directory</a>
<a href="debian-live-12.6.0-amd64-kde.iso">debian-live-12.6.0-amd64-kde.iso</a>
<a href="debian-live-12.7.0-amd64-kde.iso">debian-live-12.7.0-amd64-kde.iso</a>
<a href="debian-live-12.7.0-amd64-gnome.iso">debian-live-12.7.0-amd64-gnome.iso</a>
<a href="SHA256SUMS">SHA256SUMS</a>
</body></html>
"#;

    fn mirrors() -> Vec<String> {
        vec!["https://cdimage.debian.org/debian-cd/current-live/amd64/iso-hybrid".to_string()]
    }

    #[tokio::test]
    async fn picks_greatest_version_among_matches() {
        let client = FakeClient::with_page(&mirrors()[0], INDEX.to_string());
        let resolved = locate(
            &client,
            &mirrors(),
            r"debian-live-.*\.iso$",
            r"debian-live-([0-9.]+)-",
            None,
            &VersionStyle::default(),
        )
        .await
        .unwrap();

        assert_eq!(resolved.version.as_ref().unwrap().to_string(), "12.7.0");
        // Both 12.7.0 spins are candidates; 12.6.0 is not.
        assert_eq!(resolved.candidates.len(), 2);
        assert!(resolved
            .candidates
            .iter()
            .all(|c| c.name.contains("12.7.0")));
    }

    #[tokio::test]
    async fn relative_links_resolve_against_the_mirror() {
        let client = FakeClient::with_page(&mirrors()[0], INDEX.to_string());
        let resolved = locate(
            &client,
            &mirrors(),
            r"debian-live-.*-gnome\.iso$",
            r"debian-live-([0-9.]+)-",
            None,
            &VersionStyle::default(),
        )
        .await
        .unwrap();
        assert_eq!(
            resolved.candidates[0].url,
            "https://cdimage.debian.org/debian-cd/current-live/amd64/iso-hybrid/debian-live-12.7.0-amd64-gnome.iso"
        );
    }

    #[tokio::test]
    async fn discovers_listing_checksum_file() {
        let client = FakeClient::with_page(&mirrors()[0], INDEX.to_string());
        let resolved = locate(
            &client,
            &mirrors(),
            r"debian-live-.*\.iso$",
            r"debian-live-([0-9.]+)-",
            None,
            &VersionStyle::default(),
        )
        .await
        .unwrap();
        let Some(crate::ChecksumRef::File { url, .. }) = resolved.checksum else {
            panic!("expected checksum file");
        };
        assert!(url.ends_with("/SHA256SUMS"));
    }

    #[tokio::test]
    async fn unreachable_mirror_is_a_network_error() {
        let client = FakeClient::default();
        let err = locate(
            &client,
            &mirrors(),
            r".*\.iso$",
            r"([0-9.]+)",
            None,
            &VersionStyle::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::Network(_)));
    }

    #[tokio::test]
    async fn listing_without_matches_is_not_found() {
        let client = FakeClient::with_page(&mirrors()[0], "<a href=\"notes.txt\">x</a>".to_string());
        let err = locate(
            &client,
            &mirrors(),
            r".*\.iso$",
            r"([0-9.]+)",
            None,
            &VersionStyle::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_mirror_list_rejected() {
        let client = FakeClient::default();
        let err = locate(&client, &[], r".*", r".*", None, &VersionStyle::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::NoMirrors));
    }

    #[tokio::test]
    async fn leading_zero_versions_keep_their_candidates() {
        let index = r#"
<a href="TempleOS_Distro_5.02.ISO">TempleOS_Distro_5.02.ISO</a>
<a href="TempleOS_Distro_5.03.ISO">TempleOS_Distro_5.03.ISO</a>
"#;
        let mirror = vec!["https://templeos.example/Downloads".to_string()];
        let client = FakeClient::with_page(&mirror[0], index.to_string());
        let resolved = locate(
            &client,
            &mirror,
            r"TempleOS_Distro_[0-9.]+\.ISO$",
            r"TempleOS_Distro_([0-9.]+)\.ISO$",
            None,
            &VersionStyle::default(),
        )
        .await
        .unwrap();

        // `5.03` must not come back respelled as `5.3`, or the candidate
        // filter below it would match nothing.
        assert_eq!(resolved.version.as_ref().unwrap().to_string(), "5.03");
        assert_eq!(resolved.candidates.len(), 1);
        assert!(resolved.candidates[0]
            .url
            .ends_with("TempleOS_Distro_5.03.ISO"));
    }

    #[tokio::test]
    async fn version_pattern_without_capture_group_uses_whole_match() {
        let client = FakeClient::with_page(&mirrors()[0], INDEX.to_string());
        let resolved = locate(
            &client,
            &mirrors(),
            r"debian-live-.*\.iso$",
            r"[0-9]+\.[0-9]+\.[0-9]+",
            None,
            &VersionStyle::default(),
        )
        .await
        .unwrap();
        assert_eq!(resolved.version.as_ref().unwrap().to_string(), "12.7.0");
    }

    #[tokio::test]
    async fn link_template_builds_url_from_version_directories() {
        let index = r#"
<a href="21.3/">21.3/</a>
<a href="22.1/">22.1/</a>
"#;
        let mirror = vec!["https://mirrors.example/linuxmint/stable".to_string()];
        let client = FakeClient::with_page(&mirror[0], index.to_string());
        let resolved = locate(
            &client,
            &mirror,
            r"/stable/[0-9.]+/$",
            r"/stable/([0-9.]+)/$",
            Some("[[VER]]/linuxmint-[[VER]]-cinnamon-64bit.iso"),
            &VersionStyle::default(),
        )
        .await
        .unwrap();

        assert_eq!(resolved.version.as_ref().unwrap().to_string(), "22.1");
        assert_eq!(
            resolved.candidates[0].url,
            "https://mirrors.example/linuxmint/stable/22.1/linuxmint-22.1-cinnamon-64bit.iso"
        );
    }
}
