//! 读穿透中间件与失效器的独立测试（不依赖数据库）

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode},
    middleware::from_fn_with_state,
    routing::get,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;

use chapter_dashboard::cache::{
    CACHE_STATUS_HEADER, CacheInvalidator, CacheKeyDeriver, CacheStore, MemoryStore, QueryParams,
    ResponseCache, read_through,
};
use chapter_dashboard::config::KeyScope;

const PREFIX: &str = "test:";

fn deriver(scope: KeyScope) -> CacheKeyDeriver {
    CacheKeyDeriver::new(PREFIX, "/api/v1", scope)
}

struct Harness {
    router: Router,
    store: Arc<MemoryStore>,
    calls: Arc<AtomicUsize>,
}

/// 一个计数处理器，按路径返回不同内容
fn harness(scope: KeyScope, ttl: u64) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = ResponseCache::new(store.clone(), deriver(scope), ttl);

    let counter = Arc::clone(&calls);
    let item = move |axum::extract::Path(id): axum::extract::Path<String>| {
        let counter = Arc::clone(&counter);
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Json(json!({"status": "success", "data": {"id": id, "call": n}}))
        }
    };
    let counter = Arc::clone(&calls);
    let failing = move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            (StatusCode::NOT_FOUND, Json(json!({"status": "error"})))
        }
    };
    let counter = Arc::clone(&calls);
    let array = move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Json(json!([1, 2, 3]))
        }
    };

    let layer = from_fn_with_state(cache, read_through);
    let router = Router::new()
        .route("/api/v1/chapters/{id}", get(item).layer(layer.clone()))
        .route("/api/v1/missing", get(failing).layer(layer.clone()))
        .route("/api/v1/array", get(array).layer(layer));

    Harness {
        router,
        store,
        calls,
    }
}

impl Harness {
    async fn get(&self, uri: &str) -> (StatusCode, Option<String>, Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let cache_header = response
            .headers()
            .get(CACHE_STATUS_HEADER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, cache_header, serde_json::from_slice(&bytes).unwrap())
    }

    async fn settle(&self) {
        // 后台写入在独立任务中完成
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tokio::test(start_paused = true)]
async fn hit_skips_handler_until_ttl_expires() {
    let h = harness(KeyScope::Resolved, 60);

    let (_, header, miss) = h.get("/api/v1/chapters/1").await;
    assert_eq!(header.as_deref(), Some("MISS"));
    h.settle().await;

    let (status, header, hit) = h.get("/api/v1/chapters/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(header.as_deref(), Some("HIT"));
    assert_eq!(hit["data"], miss["data"]);
    assert_eq!(hit["cached"], true);
    assert_eq!(h.calls(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    let (_, header, fresh) = h.get("/api/v1/chapters/1").await;
    assert_eq!(header.as_deref(), Some("MISS"));
    assert_eq!(fresh["data"]["call"], 2);
}

#[tokio::test(start_paused = true)]
async fn template_scope_shares_entries_across_ids() {
    let h = harness(KeyScope::Template, 60);

    h.get("/api/v1/chapters/1").await;
    h.settle().await;
    let (_, header, body) = h.get("/api/v1/chapters/2").await;

    // 模板范围下 /chapters/2 命中 /chapters/1 的缓存
    assert_eq!(header.as_deref(), Some("HIT"));
    assert_eq!(body["data"]["id"], "1");
    assert_eq!(
        h.store.keys("test:/chapters/{id}:*").await.unwrap().len(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn resolved_scope_keys_each_id() {
    let h = harness(KeyScope::Resolved, 60);

    h.get("/api/v1/chapters/1").await;
    h.settle().await;
    let (_, header, body) = h.get("/api/v1/chapters/2").await;

    assert_eq!(header.as_deref(), Some("MISS"));
    assert_eq!(body["data"]["id"], "2");
}

#[tokio::test(start_paused = true)]
async fn non_success_and_non_object_bodies_are_not_stored() {
    let h = harness(KeyScope::Resolved, 60);

    let (status, header, _) = h.get("/api/v1/missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(header, None);

    let (status, _, body) = h.get("/api/v1/array").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([1, 2, 3]));
    h.settle().await;

    assert!(h.store.is_empty());
    h.get("/api/v1/array").await;
    assert_eq!(h.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn corrupt_entries_are_treated_as_miss() {
    let h = harness(KeyScope::Resolved, 60);
    let key = deriver(KeyScope::Resolved).derive_key("/chapters/7", None, &QueryParams::default());
    h.store.set_ex(&key, "not json", 60).await.unwrap();

    let (_, header, body) = h.get("/api/v1/chapters/7").await;
    assert_eq!(header.as_deref(), Some("MISS"));
    assert_eq!(body["data"]["id"], "7");
    h.settle().await;

    // 未命中后重新写入了合法内容
    let stored: Value = serde_json::from_str(&h.store.get(&key).await.unwrap().unwrap()).unwrap();
    assert_eq!(stored["data"]["id"], "7");
}

#[tokio::test(start_paused = true)]
async fn invalidation_clears_matching_entries_only() {
    let h = harness(KeyScope::Resolved, 60);
    h.get("/api/v1/chapters/1").await;
    h.get("/api/v1/chapters/2?sort=title").await;
    h.settle().await;

    let d = deriver(KeyScope::Resolved);
    let user_key = d.derive_key("/auth/profile", Some(4), &QueryParams::default());
    h.store.set_ex(&user_key, "{}", 60).await.unwrap();

    let invalidator = CacheInvalidator::new(h.store.clone(), d);
    assert_eq!(invalidator.invalidate_chapters().await, 2);
    assert_eq!(invalidator.invalidate_chapters().await, 0);
    assert_eq!(h.store.len(), 1);
    assert_eq!(invalidator.invalidate_user(4).await, 1);
    assert!(h.store.is_empty());
}
