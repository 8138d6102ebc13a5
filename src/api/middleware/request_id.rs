//! # Request ID 中间件
//!
//! 为每个请求分配 `request_id` 并注入到请求扩展中；上游代理传入的合法
//! `x-request-id` 会被沿用，便于跨服务关联日志。

use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use std::fmt;
use std::ops::Deref;
use uuid::Uuid;

/// 请求 ID 响应头
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_INBOUND_LEN: usize = 128;

/// 请求ID类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 沿用外部传入的 ID：非空、长度受限、仅含可见 ASCII
    #[must_use]
    pub fn from_inbound(value: &str) -> Option<Self> {
        let value = value.trim();
        let acceptable = !value.is_empty()
            && value.len() <= MAX_INBOUND_LEN
            && value.bytes().all(|b| b.is_ascii_graphic());
        acceptable.then(|| Self(value.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for RequestId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// 请求ID中间件
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(RequestId::from_inbound)
        .unwrap_or_default();
    request.extensions_mut().insert(request_id.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
