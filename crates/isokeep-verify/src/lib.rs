//! Verification primitives for downloaded artifacts.
//!
//! Checksums establish that a download arrived intact; a detached
//! signature over the published checksum file establishes that the
//! checksums themselves came from the vendor. A valid checksum from a
//! compromised source proves nothing, so signature failure is always
//! fatal even when the digest matches.
//!
//! This crate is pure computation: no network, no knowledge of where a
//! checksum reference came from.

mod checksum;
mod error;
mod hasher;
mod signature;

pub use checksum::{digest_file, parse_checksum_text, verify_file_checksum, ChecksumAlgo};
pub use error::VerifyError;
pub use hasher::{make_hasher, Hasher, Md5Hasher, Sha1Hasher, Sha256Hasher, Sha512Hasher};
pub use signature::verify_detached_signature;
