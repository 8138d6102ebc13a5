//! # 认证处理器

use axum::{extract::State, http::StatusCode, response::Response};
use serde_json::json;

use crate::api::extract::JsonBody;
use crate::api::middleware::CurrentUser;
use crate::api::response;
use crate::api::server::AppState;
use crate::auth::{LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::error::Result;

/// 注册
pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> Result<Response> {
    let session = state.auth_service.register(request).await?;
    Ok(response::success_with_message(
        StatusCode::CREATED,
        session,
        "User registered successfully",
    ))
}

/// 登录
pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Response> {
    let session = state.auth_service.login(request).await?;
    Ok(response::success_with_message(
        StatusCode::OK,
        session,
        "Login successful",
    ))
}

/// 当前用户资料
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response> {
    let view = state.auth_service.profile(user.user_id).await?;
    Ok(response::success(json!({ "user": view })))
}

/// 更新资料
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(request): JsonBody<UpdateProfileRequest>,
) -> Result<Response> {
    let view = state.auth_service.update_profile(user.user_id, request).await?;
    Ok(response::success_with_message(
        StatusCode::OK,
        json!({ "user": view }),
        "Profile updated successfully",
    ))
}

/// 登出：令牌是无状态的，客户端丢弃即可
pub async fn logout(CurrentUser(_user): CurrentUser) -> Response {
    response::success_without_data("Logout successful")
}
