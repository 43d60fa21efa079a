//! GitHub release-listing locator.

use isokeep_fetch::HttpClient;
use isokeep_version::{Version, VersionStyle};
use regex::Regex;
use serde::Deserialize;

use crate::candidate::Candidate;
use crate::descriptor::ReleaseVersionFrom;
use crate::error::SourceError;
use crate::resolve::{discover_checksum, ResolvedVersion};

const API_URL: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    name: Option<String>,
    draft: bool,
    prerelease: bool,
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    name: String,
    browser_download_url: String,
}

fn compile(pattern: &str) -> Result<Regex, SourceError> {
    Regex::new(pattern).map_err(|source| SourceError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn capture_version(
    re: &Regex,
    haystack: &str,
    style: &VersionStyle,
    location: &str,
) -> Result<Option<Version>, SourceError> {
    match re.captures(haystack) {
        Some(caps) => {
            let raw = caps.get(1).map_or(caps[0].to_string(), |m| m.as_str().to_string());
            Version::parse(&raw, style)
                .map(Some)
                .map_err(|e| SourceError::bad_version(location, e))
        }
        None => Ok(None),
    }
}

/// Resolve the latest release of `owner/repo`.
///
/// Releases are assumed published in order, so the newest non-draft,
/// non-prerelease entry wins; no semantic-version parsing of the listing
/// itself.
pub(crate) async fn locate<C: HttpClient>(
    client: &C,
    repo: &str,
    asset_pattern: &str,
    version_from: ReleaseVersionFrom,
    version_pattern: &str,
    style: &VersionStyle,
) -> Result<ResolvedVersion, SourceError> {
    let url = format!("{API_URL}/repos/{repo}/releases");
    let body = client.get_text(&url).await?;
    let releases: Vec<Release> = serde_json::from_str(&body)
        .map_err(|e| SourceError::parse("release listing", &url, e))?;

    let release = releases
        .iter()
        .find(|r| !r.draft && !r.prerelease)
        .ok_or_else(|| SourceError::NotFound {
            location: url.clone(),
            pattern: asset_pattern.to_string(),
        })?;

    let asset_re = compile(asset_pattern)?;
    let version_re = compile(version_pattern)?;

    let assets: Vec<&Asset> = release
        .assets
        .iter()
        .filter(|a| asset_re.is_match(&a.name))
        .collect();
    if assets.is_empty() {
        return Err(SourceError::NotFound {
            location: url,
            pattern: asset_pattern.to_string(),
        });
    }

    let version = match version_from {
        ReleaseVersionFrom::Tag => capture_version(&version_re, &release.tag_name, style, &url)?,
        ReleaseVersionFrom::Name => match &release.name {
            Some(name) => capture_version(&version_re, name, style, &url)?,
            None => None,
        },
        ReleaseVersionFrom::FileName => {
            let mut best: Option<Version> = None;
            for asset in &assets {
                if let Some(v) = capture_version(&version_re, &asset.name, style, &url)? {
                    if best.as_ref().is_none_or(|b| v > *b) {
                        best = Some(v);
                    }
                }
            }
            best
        }
    };
    let version = version.ok_or_else(|| {
        SourceError::parse(
            "version",
            &url,
            format!("pattern {version_pattern:?} matched nothing in the latest release"),
        )
    })?;

    let candidates = assets
        .iter()
        .map(|a| {
            let mut c = Candidate::new(a.browser_download_url.clone());
            c.name = a.name.clone();
            c.version = Some(version.clone());
            c
        })
        .collect();

    // Checksum companions are separate assets of the same release.
    let checksum = discover_checksum(
        release
            .assets
            .iter()
            .map(|a| a.browser_download_url.as_str()),
    );

    Ok(ResolvedVersion {
        version: Some(version),
        candidates,
        checksum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::ChecksumRef;
    use crate::testutil::FakeClient;

    fn listing() -> String {
        serde_json::json!([
            {
                "tag_name": "v7.20",
                "name": "MemTest86+ 7.20",
                "draft": false,
                "prerelease": false,
                "assets": [
                    {"name": "mt86plus_7.20_64.iso.zip", "browser_download_url": "http://gh/dl/mt86plus_7.20_64.iso.zip"},
                    {"name": "mt86plus_7.20_32.iso.zip", "browser_download_url": "http://gh/dl/mt86plus_7.20_32.iso.zip"},
                    {"name": "sha256sums.txt", "browser_download_url": "http://gh/dl/sha256sums.txt"}
                ]
            },
            {
                "tag_name": "v7.10",
                "name": "MemTest86+ 7.10",
                "draft": false,
                "prerelease": false,
                "assets": []
            }
        ])
        .to_string()
    }

    #[tokio::test]
    async fn takes_newest_release_and_filters_assets() {
        let client = FakeClient::with_page(
            "https://api.github.com/repos/memtest86plus/memtest86plus/releases",
            listing(),
        );
        let resolved = locate(
            &client,
            "memtest86plus/memtest86plus",
            r"mt86plus_.*_64\.iso\.zip",
            ReleaseVersionFrom::Tag,
            r"v([0-9.]+)",
            &VersionStyle::default(),
        )
        .await
        .unwrap();

        assert_eq!(resolved.version.as_ref().unwrap().to_string(), "7.20");
        assert_eq!(resolved.candidates.len(), 1);
        assert_eq!(resolved.candidates[0].name, "mt86plus_7.20_64.iso.zip");
        assert!(matches!(resolved.checksum, Some(ChecksumRef::File { .. })));
    }

    #[tokio::test]
    async fn skips_prereleases() {
        let body = serde_json::json!([
            {"tag_name": "v8.0-rc1", "name": null, "draft": false, "prerelease": true,
             "assets": [{"name": "a-8.0rc1.iso", "browser_download_url": "http://gh/a-8.0rc1.iso"}]},
            {"tag_name": "v7.0", "name": null, "draft": false, "prerelease": false,
             "assets": [{"name": "a-7.0.iso", "browser_download_url": "http://gh/a-7.0.iso"}]}
        ])
        .to_string();
        let client =
            FakeClient::with_page("https://api.github.com/repos/o/r/releases", body);
        let resolved = locate(
            &client,
            "o/r",
            r".*\.iso",
            ReleaseVersionFrom::Tag,
            r"v([0-9.]+)",
            &VersionStyle::default(),
        )
        .await
        .unwrap();
        assert_eq!(resolved.version.unwrap().to_string(), "7.0");
    }

    #[tokio::test]
    async fn version_from_file_name() {
        let body = serde_json::json!([
            {"tag_name": "stable", "name": null, "draft": false, "prerelease": false,
             "assets": [
                {"name": "shredos-2024.02.2-x86_64.img", "browser_download_url": "http://gh/shredos-2024.02.2-x86_64.img"}
             ]}
        ])
        .to_string();
        let client =
            FakeClient::with_page("https://api.github.com/repos/o/r/releases", body);
        let resolved = locate(
            &client,
            "o/r",
            r"shredos-.*\.img",
            ReleaseVersionFrom::FileName,
            r"shredos-([0-9.]+)-",
            &VersionStyle::default(),
        )
        .await
        .unwrap();
        assert_eq!(resolved.version.unwrap().to_string(), "2024.02.2");
    }

    #[tokio::test]
    async fn no_matching_asset_is_not_found() {
        let client = FakeClient::with_page(
            "https://api.github.com/repos/o/r/releases",
            listing(),
        );
        let err = locate(
            &client,
            "o/r",
            r"nonexistent\.iso",
            ReleaseVersionFrom::Tag,
            r"v([0-9.]+)",
            &VersionStyle::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn garbage_listing_is_parse_error() {
        let client = FakeClient::with_page(
            "https://api.github.com/repos/o/r/releases",
            "<html>rate limited</html>".to_string(),
        );
        let err = locate(
            &client,
            "o/r",
            r".*",
            ReleaseVersionFrom::Tag,
            r"v([0-9.]+)",
            &VersionStyle::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }
}
