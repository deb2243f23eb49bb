//! Application state - shared across all handlers.

use std::sync::Arc;

use yatube_core::ports::{
    Cache, CacheError, Clock, CommentRepository, FollowRepository, GroupRepository,
    PasswordService, PostRepository, TokenService, UserRepository,
};
use yatube_core::services::{
    CachedHomeFeed, FeedService, GroupService, PostService, SubscriptionService,
};
use yatube_infra::{Argon2PasswordService, InMemoryCache, InMemoryStore, JwtTokenService, SystemClock};

#[cfg(feature = "redis")]
use yatube_infra::RedisCache;
#[cfg(feature = "postgres")]
use yatube_infra::PostgresStore;

use crate::config::AppConfig;
use crate::handlers::ApiPageRenderer;

/// Everything one store implementation has to provide.
pub trait EntityStore:
    UserRepository + GroupRepository + PostRepository + CommentRepository + FollowRepository + 'static
{
}

impl<T> EntityStore for T where
    T: UserRepository
        + GroupRepository
        + PostRepository
        + CommentRepository
        + FollowRepository
        + 'static
{
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub feed: Arc<FeedService>,
    pub home: Arc<CachedHomeFeed>,
    pub posts: Arc<PostService>,
    pub groups: Arc<GroupService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub tokens: Arc<dyn TokenService>,
    pub passwords: Arc<dyn PasswordService>,
    pub clock: Arc<dyn Clock>,
    pub store_backend: &'static str,
    pub cache_backend: &'static str,
}

impl AppState {
    /// Wire the services over one store.
    pub fn assemble<S: EntityStore>(
        store: Arc<S>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        let feed = Arc::new(FeedService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let home = CachedHomeFeed::new(feed.clone(), cache).with_renderer(Arc::new(ApiPageRenderer));

        Self {
            users: store.clone(),
            home: Arc::new(home),
            posts: Arc::new(PostService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                clock.clone(),
            )),
            groups: Arc::new(GroupService::new(store.clone())),
            subscriptions: Arc::new(SubscriptionService::new(store.clone(), store)),
            feed,
            tokens,
            passwords,
            clock,
            store_backend: "memory",
            cache_backend: "memory",
        }
    }

    fn with_backends(mut self, store: &'static str, cache: &'static str) -> Self {
        self.store_backend = store;
        self.cache_backend = cache;
        self
    }

    /// Build the application state from configuration, falling back to
    /// in-memory implementations where a backend is missing or unreachable.
    pub async fn new(config: &AppConfig) -> Result<Self, CacheError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let (cache, cache_backend) = build_cache(config, clock.clone()).await?;
        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::from_env());
        let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());

        #[cfg(feature = "postgres")]
        if let Some(db_config) = &config.database {
            match yatube_infra::database::connect(db_config).await {
                Ok(conn) => {
                    tracing::info!("Application state initialized (postgres store)");
                    let store = Arc::new(PostgresStore::new(conn));
                    return Ok(Self::assemble(store, cache, clock, tokens, passwords)
                        .with_backends("postgres", cache_backend));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
                }
            }
        }

        if config.database.is_none() {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        }
        #[cfg(not(feature = "postgres"))]
        if config.database.is_some() {
            tracing::warn!("Built without postgres feature - DATABASE_URL ignored");
        }

        tracing::info!("Application state initialized (in-memory store)");
        Ok(
            Self::assemble(Arc::new(InMemoryStore::new()), cache, clock, tokens, passwords)
                .with_backends("memory", cache_backend),
        )
    }
}

#[cfg_attr(not(feature = "redis"), allow(unused_variables))]
async fn build_cache(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
) -> Result<(Arc<dyn Cache>, &'static str), CacheError> {
    #[cfg(feature = "redis")]
    if let Some(redis_config) = &config.redis {
        match RedisCache::new(redis_config.clone()).await {
            Ok(cache) => return Ok((Arc::new(cache), "redis")),
            Err(e) if redis_config.fallback_to_memory => {
                tracing::warn!(error = %e, "Redis unavailable. Using in-memory cache.");
            }
            Err(e) => return Err(e),
        }
    }

    Ok((Arc::new(InMemoryCache::with_clock(clock)), "memory"))
}
