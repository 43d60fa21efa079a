use std::io;
use std::path::PathBuf;

/// Error from a single HTTP operation.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP {code} from {url}")]
    Status { url: String, code: u16 },

    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

impl HttpError {
    /// Transient errors are worth retrying with backoff; permanent HTTP
    /// client errors (4xx except 429) are not.
    pub fn is_transient(&self) -> bool {
        match self {
            HttpError::Status { code, .. } => *code == 429 || *code >= 500,
            HttpError::Transport { .. } => true,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            HttpError::Status { url, .. } | HttpError::Transport { url, .. } => url,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: HttpError,
    },

    #[error("disk error at {path}: {source}")]
    Disk {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download cancelled")]
    Cancelled,
}

impl FetchError {
    pub(crate) fn disk(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Disk {
            path: path.into(),
            source,
        }
    }
}
