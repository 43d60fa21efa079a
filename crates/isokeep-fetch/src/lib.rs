//! Streaming HTTP downloads with staging, resume and atomic placement.
//!
//! Downloads stream into a `.part` file beside the final destination so
//! the committing rename never crosses a filesystem boundary. The staged
//! file is only renamed into place after the caller has verified it; an
//! unverified byte never lands at a final artifact path.
//!
//! The HTTP side lives behind the [`HttpClient`] trait. Production code
//! uses [`ReqwestClient`]; tests drive the download pipeline with
//! in-memory fakes.

mod error;
mod fetcher;
mod http;
mod progress;

pub use error::{FetchError, HttpError};
pub use fetcher::{FetchOptions, Fetcher, StagedDownload};
pub use http::{ByteStream, HeadInfo, HttpClient, StreamResponse};
pub use progress::{DownloadPhase, Progress, ProgressFn};

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
