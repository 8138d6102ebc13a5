//! 应用上下文（DI 容器）
//!
//! 统一持有跨模块共享的服务实例。数据库连接与缓存存储由调用方注入，
//! 测试中可替换为内存 SQLite 与 `MemoryStore`。

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::{AuthService, JwtManager};
use crate::cache::{CacheInvalidator, CacheKeyDeriver, ResponseCache, SharedCacheStore};
use crate::chapters::{ChapterRepository, ChapterService};
use crate::config::AppConfig;
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub store: SharedCacheStore,
    pub invalidator: CacheInvalidator,
    pub response_cache: ResponseCache,
    pub jwt: Arc<JwtManager>,
    pub auth_service: Arc<AuthService>,
    pub chapter_service: ChapterService,
    pub rate_limiter: RateLimiter,
    pub started_at: Instant,
}

impl AppContext {
    /// 基于配置、数据库连接与缓存存储装配所有服务
    #[must_use]
    pub fn new(
        config: Arc<AppConfig>,
        db: Arc<DatabaseConnection>,
        store: SharedCacheStore,
    ) -> Self {
        let deriver = CacheKeyDeriver::from_config(&config.cache, &config.server.api_prefix);
        let invalidator = CacheInvalidator::new(Arc::clone(&store), deriver.clone());
        let response_cache = ResponseCache::new(Arc::clone(&store), deriver, config.cache.ttl)
            .enabled(config.cache.enabled);

        let jwt = Arc::new(JwtManager::new(Arc::new(config.auth.clone())));
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&db),
            Arc::clone(&jwt),
            invalidator.clone(),
            config.auth.bcrypt_cost,
        ));
        let chapter_service =
            ChapterService::new(ChapterRepository::new(Arc::clone(&db)), invalidator.clone());
        let rate_limiter = RateLimiter::new(Arc::clone(&store));

        Self {
            config,
            db,
            store,
            invalidator,
            response_cache,
            jwt,
            auth_service,
            chapter_service,
            rate_limiter,
            started_at: Instant::now(),
        }
    }
}
