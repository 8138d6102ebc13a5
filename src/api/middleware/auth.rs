//! # 认证中间件
//!
//! `identify` 全局运行：请求带有有效 Bearer 令牌时把 `Arc<AuthContext>` 注入请求扩展，
//! 否则只记录失败原因、不拒绝请求（章节读取接口对匿名用户开放）。
//! `require_auth` / `require_admin` 挂在需要保护的路由上，据此放行或拒绝。

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::request_id::RequestId;
use crate::api::server::AppState;
use crate::auth::{AuthContext, bearer_token};
use crate::error::DashboardError;
use crate::{
    ldebug,
    logging::{LogComponent, LogStage},
};

const NO_TOKEN_MESSAGE: &str = "Access denied. No token provided.";
const ADMIN_ONLY_MESSAGE: &str = "Access denied. Admin privileges required.";

/// 令牌校验失败的原因，留给 `require_auth` 返回给客户端
#[derive(Debug, Clone)]
struct AuthRejection(String);

/// 解析调用方身份
pub async fn identify(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .map(ToString::to_string);

    if let Some(token) = token {
        match state.auth_service.authenticate(&token).await {
            Ok(ctx) => {
                request.extensions_mut().insert(Arc::new(ctx));
            }
            Err(e) => {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map_or_else(|| "unknown".to_string(), ToString::to_string);
                ldebug!(
                    request_id,
                    LogStage::Authentication,
                    LogComponent::Auth,
                    "token_rejected",
                    &format!("令牌无效: {e}")
                );
                request
                    .extensions_mut()
                    .insert(AuthRejection(e.client_message()));
            }
        }
    }

    next.run(request).await
}

fn authenticated(request: &Request) -> Result<Arc<AuthContext>, DashboardError> {
    if let Some(ctx) = request.extensions().get::<Arc<AuthContext>>() {
        return Ok(Arc::clone(ctx));
    }
    let message = request
        .extensions()
        .get::<AuthRejection>()
        .map_or(NO_TOKEN_MESSAGE, |rejection| rejection.0.as_str());
    Err(DashboardError::auth(message))
}

/// 要求已认证
pub async fn require_auth(request: Request, next: Next) -> Result<Response, DashboardError> {
    authenticated(&request)?;
    Ok(next.run(request).await)
}

/// 要求管理员角色
pub async fn require_admin(request: Request, next: Next) -> Result<Response, DashboardError> {
    let ctx = authenticated(&request)?;
    if !ctx.is_admin() {
        return Err(DashboardError::permission(ADMIN_ONLY_MESSAGE));
    }
    Ok(next.run(request).await)
}

/// 处理器参数：当前认证用户
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Arc<AuthContext>);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = DashboardError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<AuthContext>>()
            .cloned()
            .map(Self)
            .ok_or_else(|| DashboardError::auth(NO_TOKEN_MESSAGE))
    }
}
