//! Upstream source descriptors, version location and asset selection.
//!
//! Every managed title points at one upstream source, described by data
//! rather than by a type per title: a GitHub releases listing, a set of
//! mirror directory indexes, or a vendor download page. [`locate`]
//! resolves the latest version and candidate download URLs from any of
//! them; [`select`](candidate::select) then narrows the candidates to
//! exactly one asset for the requested edition/architecture/language.
//!
//! Sources are uncontrolled: pages drift, mirrors vanish. Locators fail
//! with a parse error rather than ever returning a silently wrong
//! version.

mod candidate;
mod descriptor;
mod error;
mod release;
mod mirror;
mod resolve;
mod vendor;

#[cfg(test)]
pub(crate) mod testutil;

pub use candidate::{select, Candidate, SelectionCriteria};
pub use descriptor::{ReleaseVersionFrom, SourceDescriptor, VendorRule};
pub use error::SourceError;
pub use resolve::{locate, ChecksumRef, ResolvedVersion};
