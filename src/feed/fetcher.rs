use crate::feed::parser::{parse_feed, ParseError};
use crate::model::{Article, FeedSource};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use thiserror::Error;

/// Identifying header sent with every outbound feed request
pub const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (compatible; newswire/",
    env!("CARGO_PKG_VERSION"),
    ")"
);

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const MAX_CONCURRENT_FETCHES: usize = 10;

/// Errors that can occur while fetching and parsing a single feed source.
///
/// Every variant is absorbed at the aggregation boundary: a failing source
/// is logged and contributes zero articles, nothing more.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("response too large")]
    ResponseTooLarge,
    /// Body fetched fine but was not parseable feed XML
    #[error("malformed feed: {0}")]
    Malformed(#[from] ParseError),
}

/// Builds the HTTP client used for all feed fetches.
pub fn build_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().user_agent(USER_AGENT).build()
}

/// Fetches all configured sources and merges their articles.
///
/// Holds the fixed source list and the fetch knobs; the cache owns one
/// instance for the process lifetime.
pub struct Aggregator {
    client: reqwest::Client,
    sources: Vec<FeedSource>,
    fetch_timeout: Duration,
    per_feed_limit: usize,
}

impl Aggregator {
    /// The `client` is taken by value so callers control its configuration
    /// (user agent, TLS); [`build_client`] is the production default.
    pub fn new(
        client: reqwest::Client,
        sources: Vec<FeedSource>,
        fetch_timeout: Duration,
        per_feed_limit: usize,
    ) -> Self {
        Self {
            client,
            sources,
            fetch_timeout,
            per_feed_limit,
        }
    }

    /// Runs one aggregation cycle over every configured source.
    ///
    /// Sources are fetched concurrently with bounded parallelism, each as a
    /// single best-effort attempt. Per-source failures are logged with the
    /// source name and explicitly discarded — one bad feed never aborts the
    /// cycle. The surviving articles are merged and sorted newest-first by
    /// their canonical timestamp.
    ///
    /// This function performs no caching itself; the caller commits the
    /// result.
    pub async fn aggregate_all(&self) -> Vec<Article> {
        let pending: Vec<_> = self
            .sources
            .iter()
            .enumerate()
            .map(|(idx, source)| async move { (idx, self.fetch_feed(source).await) })
            .collect();

        let outcomes: Vec<(usize, Result<Vec<Article>, FetchError>)> = stream::iter(pending)
            .buffer_unordered(MAX_CONCURRENT_FETCHES)
            .collect()
            .await;

        let mut articles = Vec::new();
        for (idx, outcome) in outcomes {
            let source = &self.sources[idx];
            match outcome {
                Ok(batch) => {
                    tracing::debug!(source = %source.name, count = batch.len(), "Fetched feed");
                    articles.extend(batch);
                }
                // Discard-on-error is the policy: the run carries on with
                // whatever the healthy sources produced
                Err(e) => {
                    tracing::warn!(source = %source.name, error = %e, "Skipping feed for this run");
                }
            }
        }

        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles
    }

    /// Single best-effort fetch of one source: GET with the identifying
    /// user agent, bounded by the configured timeout and a body size cap,
    /// then parsed into at most `per_feed_limit` articles.
    async fn fetch_feed(&self, source: &FeedSource) -> Result<Vec<Article>, FetchError> {
        let response = tokio::time::timeout(self.fetch_timeout, self.client.get(&source.url).send())
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::Network)?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = read_limited_bytes(response, MAX_FEED_SIZE).await?;
        Ok(parse_feed(&source.name, &bytes, self.per_feed_limit)?)
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
