//! Vendor download-page locator.

use isokeep_fetch::HttpClient;
use isokeep_verify::ChecksumAlgo;
use isokeep_version::{Version, VersionStyle};
use regex::Regex;

use crate::candidate::Candidate;
use crate::descriptor::VendorRule;
use crate::error::SourceError;
use crate::mirror::join_link;
use crate::resolve::{ChecksumRef, ResolvedVersion};

fn compile(pattern: &str) -> Result<Regex, SourceError> {
    Regex::new(pattern).map_err(|source| SourceError::BadPattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn first_capture<'t>(re: &Regex, text: &'t str) -> Option<&'t str> {
    re.captures(text)
        .map(|caps| caps.get(1).map_or(caps.get(0).unwrap(), |m| m).as_str())
}

/// Inline checksums carry no algorithm label; the digest length is the
/// only reliable hint.
fn algo_from_hex_len(value: &str) -> Option<ChecksumAlgo> {
    [
        ChecksumAlgo::Md5,
        ChecksumAlgo::Sha1,
        ChecksumAlgo::Sha256,
        ChecksumAlgo::Sha512,
    ]
    .into_iter()
    .find(|algo| algo.hex_len() == value.len())
}

/// Resolve version and asset from a vendor page.
///
/// Vendor markup drifts without notice; anything the patterns fail to
/// capture is a parse failure, never a silent guess.
pub(crate) async fn locate<C: HttpClient>(
    client: &C,
    url: &str,
    rule: &VendorRule,
    style: &VersionStyle,
) -> Result<ResolvedVersion, SourceError> {
    match rule {
        VendorRule::LinkRegex {
            link_pattern,
            version_pattern,
            checksum_pattern,
        } => {
            let body = client.get_text(url).await?;

            let link_re = compile(link_pattern)?;
            let link = first_capture(&link_re, &body).ok_or_else(|| {
                SourceError::parse("download link", url, format!("no match for {link_pattern:?}"))
            })?;
            let link = join_link(url, link).ok_or_else(|| {
                SourceError::parse("download link", url, format!("unusable link {link:?}"))
            })?;

            let version = match version_pattern {
                Some(pattern) => {
                    let re = compile(pattern)?;
                    // The page body first, the link as fallback.
                    let raw = first_capture(&re, &body)
                        .or_else(|| first_capture(&re, &link))
                        .ok_or_else(|| {
                            SourceError::parse(
                                "version",
                                url,
                                format!("no match for {pattern:?}"),
                            )
                        })?;
                    Some(
                        Version::parse(raw, style)
                            .map_err(|e| SourceError::bad_version(url, e))?,
                    )
                }
                None => None,
            };

            let checksum = match checksum_pattern {
                Some(pattern) => {
                    let re = compile(pattern)?;
                    let value = first_capture(&re, &body)
                        .ok_or_else(|| {
                            SourceError::parse(
                                "checksum",
                                url,
                                format!("no match for {pattern:?}"),
                            )
                        })?
                        .to_string();
                    let algo = algo_from_hex_len(&value).ok_or_else(|| {
                        SourceError::parse(
                            "checksum",
                            url,
                            format!("captured value has digest length {}", value.len()),
                        )
                    })?;
                    Some(ChecksumRef::Inline { algo, value })
                }
                None => None,
            };

            let mut candidate = Candidate::new(link);
            candidate.version = version.clone();
            Ok(ResolvedVersion {
                version,
                candidates: vec![candidate],
                checksum,
            })
        }
        VendorRule::RedirectTarget { version_pattern } => {
            let final_url = client.resolve_redirect(url).await?;
            let re = compile(version_pattern)?;
            let raw = first_capture(&re, &final_url).ok_or_else(|| {
                SourceError::parse(
                    "version",
                    url,
                    format!("redirect target {final_url:?} has no match for {version_pattern:?}"),
                )
            })?;
            let version =
                Version::parse(raw, style).map_err(|e| SourceError::bad_version(url, e))?;
            let mut candidate = Candidate::new(final_url);
            candidate.version = Some(version.clone());
            Ok(ResolvedVersion {
                version: Some(version),
                candidates: vec![candidate],
                checksum: None,
            })
        }
        VendorRule::Json {
            link_pointer,
            version_pointer,
            checksum_pointer,
        } => {
            let body = client.get_text(url).await?;
            let value: serde_json::Value = serde_json::from_str(&body)
                .map_err(|e| SourceError::parse("vendor JSON", url, e))?;

            let lookup = |pointer: &str| -> Result<String, SourceError> {
                value
                    .pointer(pointer)
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| {
                        SourceError::parse(
                            "vendor JSON",
                            url,
                            format!("no string at pointer {pointer:?}"),
                        )
                    })
            };

            let link = lookup(link_pointer)?;
            let version = Version::parse(&lookup(version_pointer)?, style)
                .map_err(|e| SourceError::bad_version(url, e))?;

            let checksum = match checksum_pointer {
                Some(pointer) => {
                    let value = lookup(pointer)?;
                    let algo = algo_from_hex_len(&value).ok_or_else(|| {
                        SourceError::parse(
                            "checksum",
                            url,
                            format!("value at {pointer:?} has digest length {}", value.len()),
                        )
                    })?;
                    Some(ChecksumRef::Inline { algo, value })
                }
                None => None,
            };

            let mut candidate = Candidate::new(link);
            candidate.version = Some(version.clone());
            Ok(ResolvedVersion {
                version: Some(version),
                candidates: vec![candidate],
                checksum,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeClient;

    #[tokio::test]
    async fn link_regex_extracts_link_version_and_checksum() {
        let page = r#"
<h1>Download FooOS 4.2.1</h1>
<a class="dl" href="/isos/foo-4.2.1.iso">Download</a>
<p>SHA-256: b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9</p>
"#;
        let client = FakeClient::with_page("https://vendor.example/download", page.to_string());
        let rule = VendorRule::LinkRegex {
            link_pattern: r#"href="(/isos/[^"]+\.iso)""#.to_string(),
            version_pattern: Some(r"FooOS ([0-9.]+)".to_string()),
            checksum_pattern: Some(r"SHA-256: ([0-9a-f]{64})".to_string()),
        };
        let resolved = locate(
            &client,
            "https://vendor.example/download",
            &rule,
            &VersionStyle::default(),
        )
        .await
        .unwrap();

        assert_eq!(resolved.version.as_ref().unwrap().to_string(), "4.2.1");
        assert_eq!(
            resolved.candidates[0].url,
            "https://vendor.example/isos/foo-4.2.1.iso"
        );
        assert!(matches!(
            resolved.checksum,
            Some(ChecksumRef::Inline {
                algo: ChecksumAlgo::Sha256,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn markup_drift_is_a_parse_error() {
        let client = FakeClient::with_page(
            "https://vendor.example/download",
            "<html>redesigned page</html>".to_string(),
        );
        let rule = VendorRule::LinkRegex {
            link_pattern: r#"href="(/isos/[^"]+\.iso)""#.to_string(),
            version_pattern: None,
            checksum_pattern: None,
        };
        let err = locate(
            &client,
            "https://vendor.example/download",
            &rule,
            &VersionStyle::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[tokio::test]
    async fn redirect_target_carries_the_version() {
        let client = FakeClient::default().redirect(
            "https://vendor.example/latest",
            "https://dl.vendor.example/baros-11.3.0-amd64.iso",
        );
        let rule = VendorRule::RedirectTarget {
            version_pattern: r"baros-([0-9.]+)-".to_string(),
        };
        let resolved = locate(
            &client,
            "https://vendor.example/latest",
            &rule,
            &VersionStyle::default(),
        )
        .await
        .unwrap();
        assert_eq!(resolved.version.unwrap().to_string(), "11.3.0");
        assert_eq!(
            resolved.candidates[0].url,
            "https://dl.vendor.example/baros-11.3.0-amd64.iso"
        );
    }

    #[tokio::test]
    async fn json_pointers_resolve() {
        let body = serde_json::json!({
            "latest": {
                "version": "2024.3",
                "iso": "https://dl.vendor.example/os-2024.3.iso",
                "sha256": "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
            }
        })
        .to_string();
        let client = FakeClient::with_page("https://vendor.example/releases.json", body);
        let rule = VendorRule::Json {
            link_pointer: "/latest/iso".to_string(),
            version_pointer: "/latest/version".to_string(),
            checksum_pointer: Some("/latest/sha256".to_string()),
        };
        let resolved = locate(
            &client,
            "https://vendor.example/releases.json",
            &rule,
            &VersionStyle::default(),
        )
        .await
        .unwrap();
        assert_eq!(resolved.version.unwrap().to_string(), "2024.3");
        assert!(matches!(resolved.checksum, Some(ChecksumRef::Inline { .. })));
    }

    #[tokio::test]
    async fn missing_json_pointer_is_a_parse_error() {
        let client = FakeClient::with_page(
            "https://vendor.example/releases.json",
            "{}".to_string(),
        );
        let rule = VendorRule::Json {
            link_pointer: "/latest/iso".to_string(),
            version_pointer: "/latest/version".to_string(),
            checksum_pointer: None,
        };
        let err = locate(
            &client,
            "https://vendor.example/releases.json",
            &rule,
            &VersionStyle::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }
}
