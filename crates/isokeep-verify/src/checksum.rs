use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VerifyError};
use crate::hasher::make_hasher;

/// Matches the original tool's streaming read size.
const READ_CHUNK_SIZE: usize = 512 * 1024;

/// Digest algorithms found in the wild across distribution mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgo {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgo {
    /// Length of the hex encoding, used to sanity-check parsed values.
    pub fn hex_len(self) -> usize {
        match self {
            ChecksumAlgo::Md5 => 32,
            ChecksumAlgo::Sha1 => 40,
            ChecksumAlgo::Sha256 => 64,
            ChecksumAlgo::Sha512 => 128,
        }
    }

    /// Guess the algorithm from a checksum file's name or URL.
    /// Longest digests are probed first so "sha512" never matches "sha1".
    pub fn from_name_hint(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        for algo in [
            ChecksumAlgo::Sha512,
            ChecksumAlgo::Sha256,
            ChecksumAlgo::Sha1,
            ChecksumAlgo::Md5,
        ] {
            if lower.contains(algo.name()) {
                return Some(algo);
            }
        }
        None
    }

    pub fn name(self) -> &'static str {
        match self {
            ChecksumAlgo::Md5 => "md5",
            ChecksumAlgo::Sha1 => "sha1",
            ChecksumAlgo::Sha256 => "sha256",
            ChecksumAlgo::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for ChecksumAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stream-digest a file without loading it into memory. ISO images run
/// to several gigabytes.
pub fn digest_file(path: &Path, algo: ChecksumAlgo) -> Result<Vec<u8>> {
    let mut file = File::open(path).map_err(|e| VerifyError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut hasher = make_hasher(algo);
    let mut buf = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let n = file.read(&mut buf).map_err(|e| VerifyError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Compare a file's digest against an expected hex value.
pub fn verify_file_checksum(path: &Path, algo: ChecksumAlgo, expected_hex: &str) -> Result<()> {
    let expected = expected_hex.trim().to_lowercase();
    if expected.len() != algo.hex_len() || !expected.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(VerifyError::InvalidHex(expected_hex.to_string()));
    }
    let actual = hex::encode(digest_file(path, algo)?);
    if actual == expected {
        Ok(())
    } else {
        Err(VerifyError::Mismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        })
    }
}

/// Extract a digest from the text of a published checksum file.
///
/// Finds the first line containing every string in `match_strings` and
/// returns the whitespace-separated column at `position`. Mirrors
/// publish both `<hash>  <file>` and `<file>: <hash>` layouts, hence the
/// caller-supplied column.
pub fn parse_checksum_text(
    text: &str,
    match_strings: &[&str],
    position: usize,
) -> Result<String> {
    let line = text
        .lines()
        .find(|line| match_strings.iter().all(|m| line.contains(m)))
        .ok_or_else(|| VerifyError::HashNotListed {
            wanted: match_strings.iter().map(|s| s.to_string()).collect(),
        })?;

    line.split_whitespace()
        .nth(position)
        .map(|s| s.trim_matches(|c: char| !c.is_ascii_hexdigit()).to_string())
        .ok_or_else(|| VerifyError::MalformedChecksumLine {
            line: line.to_string(),
            position,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn digest_and_verify_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.iso");
        let mut f = File::create(&path).unwrap();
        f.write_all(b"hello world").unwrap();

        verify_file_checksum(
            &path,
            ChecksumAlgo::Sha256,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        )
        .unwrap();
    }

    #[test]
    fn mismatch_reports_both_digests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.iso");
        std::fs::write(&path, b"hello world").unwrap();

        let err = verify_file_checksum(
            &path,
            ChecksumAlgo::Sha256,
            &"0".repeat(64),
        )
        .unwrap_err();
        assert!(matches!(err, VerifyError::Mismatch { .. }));
    }

    #[test]
    fn uppercase_expected_hex_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact.iso");
        std::fs::write(&path, b"hello world").unwrap();

        verify_file_checksum(
            &path,
            ChecksumAlgo::Sha256,
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9",
        )
        .unwrap();
    }

    #[test]
    fn wrong_length_hex_rejected_before_hashing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.iso");
        // File does not exist; the hex check fires first.
        let err = verify_file_checksum(&path, ChecksumAlgo::Sha256, "abcd").unwrap_err();
        assert!(matches!(err, VerifyError::InvalidHex(_)));
    }

    #[test]
    fn parse_sums_layout() {
        let text = "\
aaaa111122223333  debian-live-12.7.0-amd64-kde.iso
bbbb444455556666  debian-live-12.7.0-amd64-gnome.iso";
        let hash = parse_checksum_text(text, &["gnome"], 0).unwrap();
        assert_eq!(hash, "bbbb444455556666");
    }

    #[test]
    fn parse_reversed_layout() {
        let text = "archlinux-2024.08.01-x86_64.iso: deadbeef";
        let hash = parse_checksum_text(text, &["archlinux"], 1).unwrap();
        assert_eq!(hash, "deadbeef");
    }

    #[test]
    fn parse_missing_entry() {
        let err = parse_checksum_text("aaaa file-a.iso", &["file-b.iso"], 0).unwrap_err();
        assert!(matches!(err, VerifyError::HashNotListed { .. }));
    }

    #[test]
    fn algo_hint_prefers_longest_match() {
        assert_eq!(
            ChecksumAlgo::from_name_hint("SHA512SUMS"),
            Some(ChecksumAlgo::Sha512)
        );
        assert_eq!(
            ChecksumAlgo::from_name_hint("https://mirror/sha256sum.txt"),
            Some(ChecksumAlgo::Sha256)
        );
        assert_eq!(ChecksumAlgo::from_name_hint("RELEASE.txt"), None);
    }
}
