//! # 缓存模块
//!
//! 读穿透响应缓存与基于模式的失效，存储后端为 Redis 或进程内存。

pub mod interceptor;
pub mod invalidation;
pub mod keys;
pub mod memory_store;
pub mod redis_store;
pub mod store;

pub use interceptor::{CACHE_STATUS_HEADER, ResponseCache, read_through};
pub use invalidation::CacheInvalidator;
pub use keys::{ANONYMOUS_CLIENT, CacheKeyDeriver, QueryParams, ResourceType};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use store::{CacheStore, SharedCacheStore, build_store};
