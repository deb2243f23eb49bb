use std::sync::Arc;
use std::time::Duration;

use crate::domain::Post;
use crate::error::DomainError;
use crate::pagination::{Page, PageNumber};
use crate::ports::{Cache, CacheError};

use super::FeedService;

/// How long a rendered home feed page is served from cache.
pub const HOME_FEED_TTL: Duration = Duration::from_secs(20);

pub const HOME_FEED_CACHE_KEY: &str = "home_feed";

/// Turns a feed page into the bytes sent to clients.
pub trait PageRenderer: Send + Sync {
    fn render(&self, page: &Page<Post>) -> Result<String, DomainError>;
}

/// Serializes the domain page as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPageRenderer;

impl PageRenderer for JsonPageRenderer {
    fn render(&self, page: &Page<Post>) -> Result<String, DomainError> {
        serde_json::to_string(page).map_err(|e| DomainError::Internal(e.to_string()))
    }
}

/// The home feed behind a TTL cache.
///
/// The key depends only on the page number, never on the viewer. Writes to
/// posts do not invalidate anything: a deleted post stays visible until the
/// entry expires or [`CachedHomeFeed::clear`] is called.
pub struct CachedHomeFeed {
    feed: Arc<FeedService>,
    cache: Arc<dyn Cache>,
    renderer: Arc<dyn PageRenderer>,
    ttl: Duration,
}

impl CachedHomeFeed {
    pub fn new(feed: Arc<FeedService>, cache: Arc<dyn Cache>) -> Self {
        Self {
            feed,
            cache,
            renderer: Arc::new(JsonPageRenderer),
            ttl: HOME_FEED_TTL,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn cache_key(page: PageNumber) -> String {
        format!("{HOME_FEED_CACHE_KEY}:page:{}", page.get())
    }

    /// Entries are stored under the page actually served, so out-of-range
    /// requests refresh the last page's entry instead of adding their own.
    pub async fn render(&self, page: PageNumber) -> Result<String, DomainError> {
        let requested = Self::cache_key(page);

        if let Some(hit) = self.cache.get(&requested).await {
            tracing::debug!(key = %requested, "Home feed cache hit");
            return Ok(hit);
        }

        tracing::debug!(key = %requested, "Home feed cache miss");
        let page = self.feed.home(page).await?;
        let rendered = self.renderer.render(&page)?;
        let key = Self::cache_key(PageNumber::new(page.number));

        if let Err(e) = self.cache.set(&key, &rendered, Some(self.ttl)).await {
            tracing::warn!(key = %key, error = %e, "Failed to store home feed in cache");
        }

        Ok(rendered)
    }

    /// Explicitly drop every cached page.
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.cache.clear().await
    }
}
