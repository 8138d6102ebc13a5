//! # 读穿透响应缓存
//!
//! 以 axum 中间件包裹处理器：命中时直接返回缓存内容并跳过处理器，
//! 未命中时执行处理器、缓冲响应体，2xx 的 JSON 对象响应在后台写入存储。
//! 缓存故障永远不会影响响应本身。

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{MatchedPath, OriginalUri, Request, State},
    http::{HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::keys::{CacheKeyDeriver, QueryParams};
use super::store::SharedCacheStore;
use crate::api::middleware::RequestId;
use crate::auth::AuthContext;
use crate::error::DashboardError;
use crate::{
    ldebug, lerror, lwarn,
    logging::{LogComponent, LogStage},
};

/// 命中/未命中标记响应头
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// 响应缓存状态（中间件的 `State`）
#[derive(Clone)]
pub struct ResponseCache {
    store: SharedCacheStore,
    deriver: Arc<CacheKeyDeriver>,
    ttl: u64,
    enabled: bool,
}

impl ResponseCache {
    #[must_use]
    pub fn new(store: SharedCacheStore, deriver: CacheKeyDeriver, ttl: u64) -> Self {
        Self {
            store,
            deriver: Arc::new(deriver),
            ttl,
            enabled: true,
        }
    }

    /// 使用不同 TTL 的副本，共享存储与推导器
    #[must_use]
    pub fn with_ttl(&self, ttl: u64) -> Self {
        Self {
            ttl,
            ..self.clone()
        }
    }

    /// 设置是否启用（关闭后中间件直接透传）
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub const fn ttl(&self) -> u64 {
        self.ttl
    }

    #[must_use]
    pub fn deriver(&self) -> &CacheKeyDeriver {
        &self.deriver
    }

    /// 根据请求推导缓存键
    #[must_use]
    pub fn key_for(&self, request: &Request) -> String {
        let template = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);
        let path = request
            .extensions()
            .get::<OriginalUri>()
            .map_or_else(|| request.uri().path(), |uri| uri.path());
        let route = self.deriver.route_identity(template, path);
        let user_id = request
            .extensions()
            .get::<Arc<AuthContext>>()
            .map(|ctx| ctx.user_id);
        let query = QueryParams::parse(request.uri().query());

        self.deriver.derive_key(&route, user_id, &query)
    }

    /// 读取并校验缓存内容；存储错误与损坏数据都按未命中处理
    async fn lookup(&self, key: &str, request_id: &str) -> Option<Map<String, Value>> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                lwarn!(
                    request_id,
                    LogStage::Cache,
                    LogComponent::Interceptor,
                    "cache_read_failed",
                    &format!("读取缓存失败，按未命中处理: key={key}, error={e}")
                );
                return None;
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) | Err(_) => {
                lwarn!(
                    request_id,
                    LogStage::Cache,
                    LogComponent::Interceptor,
                    "cache_payload_corrupt",
                    &format!("缓存内容损坏，按未命中处理: key={key}")
                );
                None
            }
        }
    }

    /// 后台写入，不阻塞响应
    fn store_in_background(&self, key: String, body: &Bytes, request_id: &str) {
        let payload = match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(_)) => match std::str::from_utf8(body) {
                Ok(text) => text.to_owned(),
                Err(_) => return,
            },
            Ok(_) | Err(_) => {
                ldebug!(
                    request_id,
                    LogStage::Cache,
                    LogComponent::Interceptor,
                    "cache_skip_non_json",
                    &format!("响应体不是 JSON 对象，跳过缓存: key={key}")
                );
                return;
            }
        };

        let store = Arc::clone(&self.store);
        let ttl = self.ttl;
        let request_id = request_id.to_owned();
        tokio::spawn(async move {
            match store.set_ex(&key, &payload, ttl).await {
                Ok(()) => ldebug!(
                    request_id,
                    LogStage::Cache,
                    LogComponent::Interceptor,
                    "cache_stored",
                    &format!("缓存写入成功: key={key}, ttl={ttl}s")
                ),
                Err(e) => lwarn!(
                    request_id,
                    LogStage::Cache,
                    LogComponent::Interceptor,
                    "cache_write_failed",
                    &format!("缓存写入失败: key={key}, error={e}")
                ),
            }
        });
    }
}

/// 命中时的响应：原始载荷 + `cached` + `cacheTimestamp`
fn hit_response(mut payload: Map<String, Value>) -> Response {
    payload.insert("cached".to_string(), Value::Bool(true));
    payload.insert(
        "cacheTimestamp".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    let mut response = (StatusCode::OK, Json(Value::Object(payload))).into_response();
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("HIT"));
    response
}

/// 读穿透缓存中间件
///
/// 用法：`route_layer(middleware::from_fn_with_state(cache, read_through))`
pub async fn read_through(
    State(cache): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Response {
    if !cache.enabled || request.method() != Method::GET || !cache.store.is_available() {
        return next.run(request).await;
    }

    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map_or_else(|| "unknown".to_string(), ToString::to_string);
    let key = cache.key_for(&request);

    if let Some(payload) = cache.lookup(&key, &request_id).await {
        ldebug!(
            request_id,
            LogStage::Cache,
            LogComponent::Interceptor,
            "cache_hit",
            &format!("缓存命中: {key}")
        );
        return hit_response(payload);
    }

    ldebug!(
        request_id,
        LogStage::Cache,
        LogComponent::Interceptor,
        "cache_miss",
        &format!("缓存未命中: {key}")
    );

    let response = next.run(request).await;
    if !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            lerror!(
                request_id,
                LogStage::Response,
                LogComponent::Interceptor,
                "buffer_body_failed",
                &format!("读取响应体失败: {e}")
            );
            // 处理器的响应体流已被消费，无法再原样回传，只能返回 500
            return DashboardError::internal_with_source("读取响应体失败", e).into_response();
        }
    };

    cache.store_in_background(key, &bytes, &request_id);
    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}
