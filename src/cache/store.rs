//! # 缓存存储抽象
//!
//! 响应缓存、失效器与限流器共用的键值存储边界。进程启动时构造一次，
//! 以 `Arc<dyn CacheStore>` 注入各组件。

use async_trait::async_trait;
use std::sync::Arc;

use super::memory_store::MemoryStore;
use super::redis_store::RedisStore;
use crate::config::{AppConfig, CacheBackend};
use crate::error::{CacheError, Result};
use crate::{
    linfo,
    logging::{LogComponent, LogStage},
};

/// 键值存储接口（Redis 语义）
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// 后端名称，用于日志与健康检查输出
    fn backend(&self) -> &'static str;

    /// 连接健康标记，每次缓存操作前检查
    fn is_available(&self) -> bool;

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError>;

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> std::result::Result<(), CacheError>;

    /// 按 glob 模式列出键（`*`、`?`、`[...]`、`\` 转义）
    async fn keys(&self, pattern: &str) -> std::result::Result<Vec<String>, CacheError>;

    /// 批量删除，返回实际删除数量
    async fn del(&self, keys: &[String]) -> std::result::Result<u64, CacheError>;

    async fn incr(&self, key: &str, delta: i64) -> std::result::Result<i64, CacheError>;

    async fn expire(&self, key: &str, ttl_seconds: u64) -> std::result::Result<bool, CacheError>;

    /// 剩余存活秒数：`-2` 表示键不存在，`-1` 表示无过期时间
    async fn ttl(&self, key: &str) -> std::result::Result<i64, CacheError>;

    async fn ping(&self) -> std::result::Result<(), CacheError>;
}

/// 共享的存储句柄
pub type SharedCacheStore = Arc<dyn CacheStore>;

/// 按配置构建缓存存储
///
/// Redis 连接失败不会中断启动：存储以不可用状态创建，由后台探测任务负责重连。
pub async fn build_store(config: &AppConfig) -> Result<SharedCacheStore> {
    match config.cache.backend {
        CacheBackend::Memory => {
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Cache,
                "memory_store",
                "使用进程内缓存存储"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
        CacheBackend::Redis => {
            let store = RedisStore::new(config.redis.clone())?;
            store.connect().await;
            store.spawn_health_probe();
            Ok(store)
        }
    }
}
