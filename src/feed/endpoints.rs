// Feed API endpoint functions.
// Builds backend URLs and exposes typed calls for the feed and search.

use reqwest::Url;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, SubfeedError};

use super::client::FeedClient;
use super::types::{AppError, FetchOutcome};

/// Join a path onto the configured API base.
pub fn endpoint_url(base: &str, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| SubfeedError::InvalidUrl(format!("{}: {}", joined, e)))
}

/// URL of the subscription feed.
pub fn videos_url(config: &Config) -> Result<Url> {
    endpoint_url(&config.api_base, &config.videos_path)
}

/// URL that starts the OAuth redirect flow.
pub fn login_url(config: &Config) -> Result<Url> {
    endpoint_url(&config.api_base, &config.login_path)
}

/// URL of the authorization-code exchange.
pub fn exchange_url(config: &Config) -> Result<Url> {
    endpoint_url(&config.api_base, &config.exchange_path)
}

/// Queries that URL normalization would turn into path navigation.
fn is_dot_segment(query: &str) -> bool {
    matches!(query, "." | "..")
}

/// URL of a search, with the query appended as one percent-encoded segment.
pub fn search_url(config: &Config, query: &str) -> Result<Url> {
    // Even %2E%2E is normalized away, so these cannot be sent as a segment
    if is_dot_segment(query) {
        return Err(SubfeedError::InvalidUrl(format!(
            "search query {:?} cannot be used as a path segment",
            query
        )));
    }

    let mut url = endpoint_url(&config.api_base, &config.search_path)?;
    url.path_segments_mut()
        .map_err(|_| SubfeedError::InvalidUrl(config.api_base.clone()))?
        .pop_if_empty()
        .push(query);
    Ok(url)
}

impl FeedClient {
    /// Fetch the subscription feed with the configured retry policy.
    pub async fn subscription_videos(&self) -> FetchOutcome {
        match videos_url(self.config()) {
            Ok(url) => self.fetcher().fetch_with_retry(&url).await,
            Err(e) => FetchOutcome::TransientFailure(e.to_string()),
        }
    }

    /// Run a search. Single attempt, same response contract as the feed.
    pub async fn search(&self, query: &str) -> FetchOutcome {
        let query = query.trim();
        if query.is_empty() {
            return FetchOutcome::EmptyOrAuthError(AppError::Backend(
                "empty search query".to_string(),
            ));
        }
        if is_dot_segment(query) {
            return FetchOutcome::EmptyOrAuthError(AppError::Backend(
                "invalid search query".to_string(),
            ));
        }

        debug!(query, "searching videos");
        match search_url(self.config(), query) {
            Ok(url) => self.fetcher().fetch_once(&url).await,
            Err(e) => FetchOutcome::TransientFailure(e.to_string()),
        }
    }
}
