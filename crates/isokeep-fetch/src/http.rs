use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::error::HttpError;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Streaming response with just enough metadata for resume handling.
pub struct StreamResponse {
    /// Status code: a ranged request answered with 200 instead of 206
    /// means the server ignored the Range header and is sending the
    /// whole body again.
    pub status: u16,
    pub body: ByteStream,
}

/// What a HEAD probe tells us ahead of a download.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadInfo {
    pub content_length: Option<u64>,
    pub accept_ranges: bool,
}

/// Minimal asynchronous HTTP surface the engine needs.
///
/// Implementations follow redirects themselves. Besides the production
/// [`ReqwestClient`] this seam is what makes locators and the download
/// pipeline testable without a network.
pub trait HttpClient: Send + Sync {
    /// Fetch a small text resource (directory index, checksum file,
    /// release metadata).
    fn get_text(&self, url: &str) -> impl Future<Output = Result<String, HttpError>> + Send;

    /// Open a streaming GET, optionally with extra headers (Range).
    fn stream(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<StreamResponse, HttpError>> + Send;

    /// Probe Content-Length and range support without a body.
    fn head(&self, url: &str) -> impl Future<Output = Result<HeadInfo, HttpError>> + Send;

    /// Follow redirects and report where `url` finally lands.
    fn resolve_redirect(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<String, HttpError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use super::*;
    use futures_util::StreamExt;

    const USER_AGENT: &str = concat!("isokeep/", env!("CARGO_PKG_VERSION"));

    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        pub fn new() -> Result<Self, reqwest::Error> {
            // Some vendor endpoints reject requests without a UA.
            let client = reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()?;
            Ok(Self { client })
        }

        fn map_err(url: &str, e: reqwest::Error) -> HttpError {
            match e.status() {
                Some(code) => HttpError::Status {
                    url: url.to_string(),
                    code: code.as_u16(),
                },
                None => HttpError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                },
            }
        }

        async fn checked_get(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<reqwest::Response, HttpError> {
            let mut request = self.client.get(url);
            for (key, value) in headers {
                request = request.header(key, value);
            }
            let response = request.send().await.map_err(|e| Self::map_err(url, e))?;
            let status = response.status();
            if status.is_client_error() || status.is_server_error() {
                return Err(HttpError::Status {
                    url: url.to_string(),
                    code: status.as_u16(),
                });
            }
            Ok(response)
        }
    }

    impl HttpClient for ReqwestClient {
        async fn get_text(&self, url: &str) -> Result<String, HttpError> {
            self.checked_get(url, &[])
                .await?
                .text()
                .await
                .map_err(|e| Self::map_err(url, e))
        }

        async fn stream(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<StreamResponse, HttpError> {
            let response = self.checked_get(url, headers).await?;
            let status = response.status().as_u16();
            let owned_url = url.to_string();
            let body = response
                .bytes_stream()
                .map(move |chunk| {
                    chunk.map_err(|e| HttpError::Transport {
                        url: owned_url.clone(),
                        message: e.to_string(),
                    })
                })
                .boxed();
            Ok(StreamResponse { status, body })
        }

        async fn head(&self, url: &str) -> Result<HeadInfo, HttpError> {
            let response = self
                .client
                .head(url)
                .send()
                .await
                .map_err(|e| Self::map_err(url, e))?;
            let content_length = response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let accept_ranges = response
                .headers()
                .get(reqwest::header::ACCEPT_RANGES)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.eq_ignore_ascii_case("bytes"));
            Ok(HeadInfo {
                content_length,
                accept_ranges,
            })
        }

        async fn resolve_redirect(&self, url: &str) -> Result<String, HttpError> {
            let response = self.checked_get(url, &[]).await?;
            Ok(response.url().to_string())
        }
    }
}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
