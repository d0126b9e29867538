use super::decode::decode_document;
use super::SourceError;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Retrieves the raw body of one upstream document.
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, SourceError>;
}

/// Blocking HTTP fetcher; call it from the blocking pool, never from async code.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn client(&self) -> Result<reqwest::blocking::Client, reqwest::Error> {
        reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("conta-comigo/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        debug!(url, timeout_secs = self.timeout.as_secs(), "fetching source document");
        let http_error = |source: reqwest::Error| SourceError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .client()
            .and_then(|client| client.get(url).send())
            .and_then(|response| response.error_for_status())
            .map_err(http_error)?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().map_err(http_error)?;

        Ok(decode_document(&body, content_type.as_deref()))
    }
}

impl<T: SourceFetcher + ?Sized> SourceFetcher for Box<T> {
    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        (**self).fetch(url)
    }
}

#[derive(Debug, Clone)]
struct StaticDocument {
    body: Vec<u8>,
    content_type: Option<String>,
}

/// Serves fixed documents by URL, for offline runs and tests.
///
/// Bodies go through the same charset handling as HTTP responses.
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    documents: HashMap<String, StaticDocument>,
}

impl StaticFetcher {
    pub fn with_document(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_encoded_document(url, body.into().into_bytes(), None)
    }

    /// Raw bytes plus the `Content-Type` a server would have sent, if any.
    pub fn with_encoded_document(
        mut self,
        url: impl Into<String>,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Self {
        self.documents.insert(
            url.into(),
            StaticDocument {
                body,
                content_type: content_type.map(str::to_owned),
            },
        );
        self
    }
}

impl SourceFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        self.documents
            .get(url)
            .map(|document| decode_document(&document.body, document.content_type.as_deref()))
            .ok_or_else(|| SourceError::Missing(url.to_string()))
    }
}
