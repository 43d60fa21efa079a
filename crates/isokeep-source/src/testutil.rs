//! In-memory HTTP fake for locator tests.

use std::collections::HashMap;

use isokeep_fetch::{HeadInfo, HttpClient, HttpError, StreamResponse};

#[derive(Default)]
pub(crate) struct FakeClient {
    pages: HashMap<String, String>,
    redirects: HashMap<String, String>,
}

impl FakeClient {
    pub(crate) fn with_page(url: &str, body: String) -> Self {
        let mut pages = HashMap::new();
        pages.insert(url.to_string(), body);
        Self {
            pages,
            redirects: HashMap::new(),
        }
    }

    pub(crate) fn redirect(mut self, url: &str, target: &str) -> Self {
        self.redirects.insert(url.to_string(), target.to_string());
        self
    }
}

impl HttpClient for FakeClient {
    async fn get_text(&self, url: &str) -> Result<String, HttpError> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| HttpError::Status {
                url: url.to_string(),
                code: 404,
            })
    }

    async fn stream(
        &self,
        url: &str,
        _headers: &[(String, String)],
    ) -> Result<StreamResponse, HttpError> {
        let body = self.get_text(url).await?;
        Ok(StreamResponse {
            status: 200,
            body: Box::pin(futures_util::stream::once(async move {
                Ok(bytes::Bytes::from(body))
            })),
        })
    }

    async fn head(&self, _url: &str) -> Result<HeadInfo, HttpError> {
        Ok(HeadInfo::default())
    }

    async fn resolve_redirect(&self, url: &str) -> Result<String, HttpError> {
        Ok(self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string()))
    }
}
