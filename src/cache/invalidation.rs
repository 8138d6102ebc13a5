//! # 缓存失效
//!
//! 写操作之后按资源类型执行模式删除：先 `KEYS pattern`，再一次性 `DEL`。
//!
//! 失效与写操作之间没有事务关系：写入提交到失效完成之间，并发读取可能把旧数据
//! 写回缓存，旧数据会保留到下一次失效或 TTL 到期。这个窗口是可接受的。

use std::sync::Arc;

use super::keys::{CacheKeyDeriver, ResourceType};
use super::store::SharedCacheStore;
use crate::{
    ldebug, linfo, lwarn,
    logging::{LogComponent, LogStage},
};

/// 缓存失效器
#[derive(Clone)]
pub struct CacheInvalidator {
    store: SharedCacheStore,
    deriver: Arc<CacheKeyDeriver>,
}

impl CacheInvalidator {
    #[must_use]
    pub fn new(store: SharedCacheStore, deriver: CacheKeyDeriver) -> Self {
        Self {
            store,
            deriver: Arc::new(deriver),
        }
    }

    /// 删除匹配模式的全部键，返回删除数量
    ///
    /// 存储不可达或命令失败时记录日志并返回 0，从不向调用方报错。
    pub async fn invalidate_by_pattern(&self, pattern: &str) -> u64 {
        if !self.store.is_available() {
            ldebug!(
                "system",
                LogStage::Cache,
                LogComponent::Invalidator,
                "invalidate_skipped",
                &format!("缓存存储不可用，跳过失效: {pattern}")
            );
            return 0;
        }

        let keys = match self.store.keys(pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                lwarn!(
                    "system",
                    LogStage::Cache,
                    LogComponent::Invalidator,
                    "list_keys_failed",
                    &format!("查找匹配的缓存键失败: {pattern}, error={e}")
                );
                return 0;
            }
        };

        if keys.is_empty() {
            return 0;
        }

        match self.store.del(&keys).await {
            Ok(deleted) => {
                linfo!(
                    "system",
                    LogStage::Cache,
                    LogComponent::Invalidator,
                    "cache_invalidated",
                    &format!("缓存已失效: pattern={pattern}, deleted={deleted}")
                );
                deleted
            }
            Err(e) => {
                lwarn!(
                    "system",
                    LogStage::Cache,
                    LogComponent::Invalidator,
                    "delete_keys_failed",
                    &format!("批量删除缓存失败: {pattern}, error={e}")
                );
                0
            }
        }
    }

    /// 按资源类型失效
    pub async fn invalidate(&self, resource: ResourceType) -> u64 {
        let pattern = self.deriver.pattern_for(&resource);
        ldebug!(
            "system",
            LogStage::Cache,
            LogComponent::Invalidator,
            "invalidate_resource",
            &format!("失效资源缓存: type={}, pattern={pattern}", resource.name())
        );
        self.invalidate_by_pattern(&pattern).await
    }

    /// 失效所有章节读取缓存
    pub async fn invalidate_chapters(&self) -> u64 {
        self.invalidate(ResourceType::Chapters).await
    }

    /// 失效某个用户作为调用方的全部缓存
    pub async fn invalidate_user(&self, user_id: i32) -> u64 {
        self.invalidate(ResourceType::User(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory_store::MemoryStore;
    use crate::cache::store::CacheStore;
    use crate::config::KeyScope;

    const PREFIX: &str = "chapter_dashboard:";

    fn setup() -> (Arc<MemoryStore>, CacheInvalidator) {
        let store = Arc::new(MemoryStore::new());
        let invalidator = CacheInvalidator::new(
            store.clone(),
            CacheKeyDeriver::new(PREFIX, "/api/v1", KeyScope::Resolved),
        );
        (store, invalidator)
    }

    #[tokio::test]
    async fn test_invalidate_removes_exactly_matching_keys() {
        let (store, invalidator) = setup();
        for suffix in ["chapters:a", "chapters:b", "users:c"] {
            store
                .set_ex(&format!("{PREFIX}{suffix}"), "{}", 60)
                .await
                .unwrap();
        }

        let deleted = invalidator
            .invalidate_by_pattern(&format!("{PREFIX}*chapters*"))
            .await;

        assert_eq!(deleted, 2);
        assert_eq!(
            store.keys("*").await.unwrap(),
            vec![format!("{PREFIX}users:c")]
        );
    }

    #[tokio::test]
    async fn test_invalidate_user_scope() {
        let (store, invalidator) = setup();
        store
            .set_ex(&format!("{PREFIX}/auth/profile:user:1:e30="), "{}", 60)
            .await
            .unwrap();
        store
            .set_ex(&format!("{PREFIX}/auth/profile:user:12:e30="), "{}", 60)
            .await
            .unwrap();

        assert_eq!(invalidator.invalidate_user(1).await, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_no_matches_is_zero() {
        let (_store, invalidator) = setup();
        assert_eq!(invalidator.invalidate_chapters().await, 0);
    }

    #[tokio::test]
    async fn test_unavailable_store_is_noop() {
        let (store, invalidator) = setup();
        store
            .set_ex(&format!("{PREFIX}chapters:a"), "{}", 60)
            .await
            .unwrap();
        store.set_available(false);

        assert_eq!(invalidator.invalidate_chapters().await, 0);

        store.set_available(true);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_pattern_is_swallowed() {
        let (_store, invalidator) = setup();
        assert_eq!(invalidator.invalidate_by_pattern("broken[").await, 0);
    }
}
