//! Task failure classification.

use std::fmt;

use isokeep_fetch::FetchError;
use isokeep_source::SourceError;
use isokeep_verify::VerifyError;
use isokeep_version::TemplateError;
use serde::Serialize;
use thiserror::Error;

/// What went wrong, coarsely, for reporting and exit-status purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Parse,
    NotFound,
    NoMatch,
    Ambiguous,
    ChecksumMismatch,
    SignatureInvalid,
    ChecksumUnavailable,
    Disk,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Network => "network",
            ErrorKind::Parse => "parse",
            ErrorKind::NotFound => "not-found",
            ErrorKind::NoMatch => "no-match",
            ErrorKind::Ambiguous => "ambiguous",
            ErrorKind::ChecksumMismatch => "checksum-mismatch",
            ErrorKind::SignatureInvalid => "signature-invalid",
            ErrorKind::ChecksumUnavailable => "checksum-unavailable",
            ErrorKind::Disk => "disk",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A task failure, caught at the task boundary and reported without
/// affecting sibling tasks.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct TaskError {
    pub kind: ErrorKind,
    pub message: String,
    fatal: bool,
}

impl TaskError {
    pub fn new(kind: ErrorKind, message: impl fmt::Display) -> Self {
        Self {
            kind,
            message: message.to_string(),
            fatal: false,
        }
    }

    /// A full disk dooms every remaining download; the run aborts early
    /// rather than failing each task in turn.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    fn disk(message: impl fmt::Display, source: &std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Disk,
            message: message.to_string(),
            fatal: source.kind() == std::io::ErrorKind::StorageFull,
        }
    }

    pub fn io(context: &str, source: std::io::Error) -> Self {
        Self::disk(format!("{context}: {source}"), &source)
    }
}

impl From<SourceError> for TaskError {
    fn from(e: SourceError) -> Self {
        let kind = match &e {
            SourceError::Network(_) => ErrorKind::Network,
            SourceError::Parse { .. } | SourceError::BadPattern { .. } => ErrorKind::Parse,
            SourceError::NotFound { .. } | SourceError::NoMirrors => ErrorKind::NotFound,
            SourceError::NoMatch { .. } => ErrorKind::NoMatch,
            SourceError::Ambiguous { .. } => ErrorKind::Ambiguous,
        };
        Self::new(kind, e)
    }
}

impl From<FetchError> for TaskError {
    fn from(e: FetchError) -> Self {
        match &e {
            FetchError::Http(_) | FetchError::RetriesExhausted { .. } => {
                Self::new(ErrorKind::Network, e)
            }
            FetchError::Disk { source, .. } => {
                let fatal = source.kind() == std::io::ErrorKind::StorageFull;
                Self {
                    kind: ErrorKind::Disk,
                    message: e.to_string(),
                    fatal,
                }
            }
            FetchError::Cancelled => Self::new(ErrorKind::Cancelled, e),
        }
    }
}

impl From<VerifyError> for TaskError {
    fn from(e: VerifyError) -> Self {
        let kind = match &e {
            VerifyError::Mismatch { .. } => ErrorKind::ChecksumMismatch,
            VerifyError::HashNotListed { .. }
            | VerifyError::MalformedChecksumLine { .. }
            | VerifyError::InvalidHex(_) => ErrorKind::Parse,
            VerifyError::InvalidPublicKey(_)
            | VerifyError::InvalidSignature(_)
            | VerifyError::SignatureInvalid => ErrorKind::SignatureInvalid,
            VerifyError::Io { .. } => ErrorKind::Disk,
        };
        Self::new(kind, e)
    }
}

impl From<TemplateError> for TaskError {
    fn from(e: TemplateError) -> Self {
        Self::new(ErrorKind::Parse, e)
    }
}
