//! # Redis 缓存存储
//!
//! 单个共享的 `ConnectionManager`（多路复用连接），首次连接成功后写入 `OnceCell`，
//! 之后每次操作无锁克隆句柄；断线重连由 `ConnectionManager` 自身完成。
//! 健康标记在命令成功时置真，在连接类错误或超时时置假；后台探测任务负责
//! 初次连接失败后的重连与周期性 PING。

use async_trait::async_trait;
use redis::{AsyncCommands, Client, RedisResult, aio::ConnectionManager};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use super::store::CacheStore;
use crate::config::RedisConfig;
use crate::error::{CacheError, DashboardError, Result};
use crate::{
    ldebug, lerror, linfo, lwarn,
    logging::{LogComponent, LogStage},
};

/// Redis 存储
pub struct RedisStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    available: AtomicBool,
    config: RedisConfig,
}

impl RedisStore {
    /// 创建尚未连接的存储
    pub fn new(config: RedisConfig) -> Result<Arc<Self>> {
        let url = config.build_url()?;
        let client = Client::open(url)
            .map_err(|e| DashboardError::cache_with_source("创建 Redis 客户端失败", e))?;

        Ok(Arc::new(Self {
            client,
            connection: OnceCell::new(),
            available: AtomicBool::new(false),
            config,
        }))
    }

    /// 尝试建立连接，返回是否成功
    pub async fn connect(&self) -> bool {
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Cache,
            "connect_to_redis",
            &format!("正在连接 Redis 服务器: {}", redacted(&self.config.url))
        );

        let timeout = Duration::from_secs(self.config.connection_timeout.max(1));
        match tokio::time::timeout(timeout, ConnectionManager::new(self.client.clone())).await {
            Ok(Ok(manager)) => {
                // 并发的重复连接以先写入者为准
                let _ = self.connection.set(manager);
                self.available.store(true, Ordering::SeqCst);
                linfo!(
                    "system",
                    LogStage::Startup,
                    LogComponent::Cache,
                    "redis_connected",
                    "Redis 连接建立成功"
                );
                true
            }
            Ok(Err(e)) => {
                self.mark_unavailable("connect", &e.to_string());
                false
            }
            Err(_) => {
                self.mark_unavailable("connect", "连接超时");
                false
            }
        }
    }

    /// 启动后台健康探测任务，存储被释放后任务自动退出
    pub fn spawn_health_probe(self: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(self);
        let interval = Duration::from_secs(self.config.health_check_interval.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = weak.upgrade() else {
                    break;
                };
                store.probe().await;
            }
        })
    }

    /// 单次健康探测：未连接则重连，已连接则 PING
    async fn probe(&self) {
        if !self.connection.initialized() {
            self.connect().await;
            return;
        }

        let was_available = self.is_available();
        match self.ping().await {
            Ok(()) if !was_available => {
                linfo!(
                    "system",
                    LogStage::HealthCheck,
                    LogComponent::Cache,
                    "redis_recovered",
                    "Redis 连接已恢复"
                );
            }
            Ok(()) => {}
            Err(e) => {
                ldebug!(
                    "system",
                    LogStage::HealthCheck,
                    LogComponent::Cache,
                    "redis_probe_failed",
                    &format!("Redis 健康探测失败: {e}")
                );
            }
        }
    }

    fn mark_unavailable(&self, operation: &str, reason: &str) {
        if self.available.swap(false, Ordering::SeqCst) {
            lwarn!(
                "system",
                LogStage::Cache,
                LogComponent::Cache,
                "redis_unavailable",
                &format!("Redis 不可用 ({operation}): {reason}")
            );
        } else {
            ldebug!(
                "system",
                LogStage::Cache,
                LogComponent::Cache,
                "redis_still_unavailable",
                &format!("Redis 仍不可用 ({operation}): {reason}")
            );
        }
    }

    /// 带超时执行命令，并按结果维护健康标记
    async fn run<T, F, Fut>(&self, operation: &str, command: F) -> std::result::Result<T, CacheError>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self
            .connection
            .get()
            .cloned()
            .ok_or(CacheError::Unavailable)?;

        let timeout_ms = self.config.command_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), command(conn)).await {
            Ok(Ok(value)) => {
                self.available.store(true, Ordering::SeqCst);
                Ok(value)
            }
            Ok(Err(e)) => {
                let err = CacheError::from(e);
                if err.is_connection_error() {
                    self.mark_unavailable(operation, &err.to_string());
                } else {
                    lerror!(
                        "system",
                        LogStage::Cache,
                        LogComponent::Cache,
                        "redis_command_failed",
                        &format!("Redis 命令失败 ({operation}): {err}")
                    );
                }
                Err(err)
            }
            Err(_) => {
                self.mark_unavailable(operation, "命令超时");
                Err(CacheError::timeout(operation, timeout_ms))
            }
        }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn get(&self, key: &str) -> std::result::Result<Option<String>, CacheError> {
        self.run("GET", |mut conn| async move { conn.get(key).await })
            .await
    }

    async fn set_ex(
        &self,
        key: &str,
        value: &str,
        ttl_seconds: u64,
    ) -> std::result::Result<(), CacheError> {
        self.run("SETEX", |mut conn| async move {
            conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await
        })
        .await
    }

    async fn keys(&self, pattern: &str) -> std::result::Result<Vec<String>, CacheError> {
        self.run("KEYS", |mut conn| async move { conn.keys(pattern).await })
            .await
    }

    async fn del(&self, keys: &[String]) -> std::result::Result<u64, CacheError> {
        if keys.is_empty() {
            return Ok(0);
        }
        self.run("DEL", |mut conn| async move { conn.del(keys).await })
            .await
    }

    async fn incr(&self, key: &str, delta: i64) -> std::result::Result<i64, CacheError> {
        self.run("INCRBY", |mut conn| async move { conn.incr(key, delta).await })
            .await
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> std::result::Result<bool, CacheError> {
        #[allow(clippy::cast_possible_wrap)]
        let seconds = ttl_seconds as i64;
        self.run("EXPIRE", |mut conn| async move { conn.expire(key, seconds).await })
            .await
    }

    async fn ttl(&self, key: &str) -> std::result::Result<i64, CacheError> {
        self.run("TTL", |mut conn| async move { conn.ttl(key).await })
            .await
    }

    async fn ping(&self) -> std::result::Result<(), CacheError> {
        let response: String = self
            .run("PING", |mut conn| async move {
                redis::cmd("PING").query_async(&mut conn).await
            })
            .await?;

        if response == "PONG" {
            Ok(())
        } else {
            Err(CacheError::unexpected_response(format!(
                "PING 返回了意外响应: {response}"
            )))
        }
    }
}

/// 日志中隐藏 URL 里的密码
fn redacted(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> RedisConfig {
        RedisConfig {
            url: "redis://127.0.0.1:1".to_string(),
            connection_timeout: 1,
            command_timeout_ms: 200,
            ..Default::default()
        }
    }

    #[test]
    fn test_redacted_hides_password() {
        assert_eq!(
            redacted("redis://:pw@localhost:6379"),
            "redis://:***@localhost:6379"
        );
        assert_eq!(redacted("redis://localhost:6379"), "redis://localhost:6379");
    }

    #[tokio::test]
    async fn test_store_starts_unavailable() {
        let store = RedisStore::new(unreachable_config()).unwrap();
        assert!(!store.is_available());
        assert!(matches!(store.get("k").await, Err(CacheError::Unavailable)));
        assert_eq!(store.del(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_connect_failure_is_not_fatal() {
        let store = RedisStore::new(unreachable_config()).unwrap();
        assert!(!store.connect().await);
        assert!(!store.is_available());
    }

    #[tokio::test]
    async fn test_failed_connect_leaves_handle_unset() {
        let store = RedisStore::new(unreachable_config()).unwrap();
        assert!(!store.connect().await);
        assert!(!store.connection.initialized());

        // 探测在未连接时重试连接，失败后句柄仍为空
        store.probe().await;
        assert!(!store.connection.initialized());
        assert!(matches!(
            store.set_ex("k", "v", 1).await,
            Err(CacheError::Unavailable)
        ));
    }

    #[tokio::test]
    #[ignore] // 需要 Redis 服务器运行
    async fn test_round_trip_against_local_redis() {
        let store = RedisStore::new(RedisConfig::default()).unwrap();
        assert!(store.connect().await);

        store.set_ex("chapter_dashboard:test:k", "v", 5).await.unwrap();
        assert_eq!(
            store.get("chapter_dashboard:test:k").await.unwrap().as_deref(),
            Some("v")
        );
        let keys = store.keys("chapter_dashboard:test:*").await.unwrap();
        assert_eq!(store.del(&keys).await.unwrap(), 1);
        store.ping().await.unwrap();
    }
}
