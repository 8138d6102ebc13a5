//! 固定窗口速率限制器
//!
//! 计数保存在共享的 `CacheStore` 中（`rl:{policy}:{client}`，`INCR` + `EXPIRE`），
//! 多实例之间一致；存储不可用时退回进程内 `DashMap` 窗口。

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::auth::AuthContext;
use crate::cache::SharedCacheStore;
use crate::config::RateLimitPolicy;
use crate::error::DashboardError;
use crate::{
    ldebug, lwarn,
    logging::{LogComponent, LogStage},
};

pub const LIMIT_HEADER: &str = "ratelimit-limit";
pub const REMAINING_HEADER: &str = "ratelimit-remaining";
pub const RESET_HEADER: &str = "ratelimit-reset";

/// 速率限制检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub allowed: bool,
    pub current: u64,
    pub limit: u64,
    /// 窗口剩余秒数
    pub reset_after: u64,
}

impl RateLimitOutcome {
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.current)
    }

    /// 写入 `RateLimit-*` 响应头
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(LIMIT_HEADER, HeaderValue::from(self.limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(self.remaining()));
        headers.insert(RESET_HEADER, HeaderValue::from(self.reset_after));
    }
}

/// 本地窗口表超过该大小时清理已过期的窗口
pub const FALLBACK_SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct LocalWindow {
    count: u64,
    resets_at: Instant,
}

/// 固定窗口限流器
#[derive(Clone)]
pub struct RateLimiter {
    store: SharedCacheStore,
    fallback: Arc<DashMap<String, LocalWindow>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(store: SharedCacheStore) -> Self {
        Self {
            store,
            fallback: Arc::new(DashMap::new()),
        }
    }

    /// 计数键
    #[must_use]
    pub fn key(policy_name: &str, client: &str) -> String {
        format!("rl:{policy_name}:{client}")
    }

    /// 记录一次请求并返回是否放行
    pub async fn check(
        &self,
        policy_name: &str,
        policy: RateLimitPolicy,
        client: &str,
    ) -> RateLimitOutcome {
        let key = Self::key(policy_name, client);
        if self.store.is_available() {
            match self.check_shared(&key, policy).await {
                Ok(outcome) => return outcome,
                Err(e) => lwarn!(
                    "system",
                    LogStage::RateLimit,
                    LogComponent::RateLimiter,
                    "shared_counter_failed",
                    &format!("共享计数失败，使用本地窗口: key={key}, error={e}")
                ),
            }
        }
        self.check_local(key, policy)
    }

    async fn check_shared(
        &self,
        key: &str,
        policy: RateLimitPolicy,
    ) -> Result<RateLimitOutcome, crate::error::CacheError> {
        let window = policy.window_secs();
        let current = self.store.incr(key, 1).await?;

        // 首次计数时开启窗口；丢失过期时间的键在这里补上
        let mut ttl = if current == 1 {
            self.store.expire(key, window).await?;
            i64::try_from(window).unwrap_or(i64::MAX)
        } else {
            self.store.ttl(key).await?
        };
        if ttl < 0 {
            self.store.expire(key, window).await?;
            ttl = i64::try_from(window).unwrap_or(i64::MAX);
        }

        let current = u64::try_from(current).unwrap_or(0);
        Ok(RateLimitOutcome {
            allowed: current <= policy.max,
            current,
            limit: policy.max,
            reset_after: u64::try_from(ttl).unwrap_or(window),
        })
    }

    fn check_local(&self, key: String, policy: RateLimitPolicy) -> RateLimitOutcome {
        let now = Instant::now();
        let window = Duration::from_millis(policy.window_ms);
        if self.fallback.len() >= FALLBACK_SWEEP_THRESHOLD {
            self.fallback.retain(|_, w| w.resets_at > now);
        }
        let mut entry = self.fallback.entry(key).or_insert(LocalWindow {
            count: 0,
            resets_at: now + window,
        });
        if entry.resets_at <= now {
            *entry = LocalWindow {
                count: 0,
                resets_at: now + window,
            };
        }
        entry.count += 1;

        let remaining = entry.resets_at.saturating_duration_since(now);
        RateLimitOutcome {
            allowed: entry.count <= policy.max,
            current: entry.count,
            limit: policy.max,
            reset_after: remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0),
        }
    }
}

/// 一条路由组上的限流规则（中间件 `State`）
#[derive(Clone)]
pub struct RateLimitRule {
    limiter: RateLimiter,
    name: &'static str,
    policy: RateLimitPolicy,
    message: &'static str,
}

impl RateLimitRule {
    #[must_use]
    pub const fn new(
        limiter: RateLimiter,
        name: &'static str,
        policy: RateLimitPolicy,
        message: &'static str,
    ) -> Self {
        Self {
            limiter,
            name,
            policy,
            message,
        }
    }

    /// 通用 API 限流
    #[must_use]
    pub const fn api(limiter: RateLimiter, policy: RateLimitPolicy) -> Self {
        Self::new(
            limiter,
            "api",
            policy,
            "Too many requests from this IP, please try again later.",
        )
    }

    /// 认证接口限流
    #[must_use]
    pub const fn auth(limiter: RateLimiter, policy: RateLimitPolicy) -> Self {
        Self::new(
            limiter,
            "auth",
            policy,
            "Too many authentication attempts. Please try again later.",
        )
    }

    /// 上传接口限流
    #[must_use]
    pub const fn upload(limiter: RateLimiter, policy: RateLimitPolicy) -> Self {
        Self::new(
            limiter,
            "upload",
            policy,
            "Too many upload attempts. Please try again later.",
        )
    }
}

/// 调用方标识：已认证用户 ID，其次为对端 IP，最后为 `X-Forwarded-For`
#[must_use]
pub fn client_key(request: &Request) -> String {
    if let Some(ctx) = request.extensions().get::<Arc<AuthContext>>() {
        return format!("user:{}", ctx.user_id);
    }
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| "unknown".to_string(), ToString::to_string)
}

/// 限流中间件
///
/// 用法：`layer(middleware::from_fn_with_state(rule, enforce))`
pub async fn enforce(State(rule): State<RateLimitRule>, request: Request, next: Next) -> Response {
    let client = client_key(&request);
    let outcome = rule.limiter.check(rule.name, rule.policy, &client).await;

    if !outcome.allowed {
        ldebug!(
            "system",
            LogStage::RateLimit,
            LogComponent::RateLimiter,
            "rate_limited",
            &format!(
                "请求被限流: policy={}, client={client}, current={}",
                rule.name, outcome.current
            )
        );
        let mut response =
            DashboardError::rate_limit(rule.message, rule.policy.window_secs()).into_response();
        outcome.apply_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    outcome.apply_headers(response.headers_mut());
    response
}
