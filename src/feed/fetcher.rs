use crate::feed::parser::{parse_feed, FeedDocument};
use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching and parsing one feed.
///
/// None of these abort a run: [`FeedReader::read`] logs them and hands back
/// an empty document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request, including the body download, exceeded the fetch timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Fetches feeds over HTTP(S) and parses them into [`FeedDocument`]s.
#[derive(Debug, Clone)]
pub struct FeedReader {
    client: reqwest::Client,
    timeout: Duration,
}

impl FeedReader {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            timeout: FETCH_TIMEOUT,
        })
    }

    /// Replace the 30 s deadline that bounds each fetch, body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch and parse `url`, degrading every failure to an empty document.
    ///
    /// A feed that cannot be reached or parsed simply yields no images, so one
    /// broken feed never stops the rest of the run.
    pub async fn read(&self, url: &str) -> FeedDocument {
        tracing::info!(feed = %url, "Parsing RSS feed");
        match self.fetch(url).await {
            Ok(doc) => {
                tracing::debug!(feed = %url, entries = doc.entries.len(), "Feed parsed");
                doc
            }
            Err(e) => {
                tracing::warn!(feed = %url, error = %e, "Feed unavailable, treating as empty");
                FeedDocument::default()
            }
        }
    }

    /// Fetch and parse `url`, surfacing the typed failure.
    ///
    /// The deadline covers connecting, the response headers and the whole
    /// body, so a server that stalls mid-download still ends in
    /// [`FetchError::Timeout`].
    pub async fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError> {
        let bytes = tokio::time::timeout(self.timeout, self.download(url))
            .await
            .map_err(|_| FetchError::Timeout)??;
        parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        read_limited_bytes(response, MAX_FEED_SIZE).await
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
