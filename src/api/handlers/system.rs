//! # 系统处理器
//!
//! 健康检查、API 索引与统一的 404 响应。

use axum::{
    Json,
    extract::{OriginalUri, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;

use crate::api::server::AppState;

#[derive(Serialize)]
struct CacheStatus {
    backend: &'static str,
    available: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfo {
    status: &'static str,
    message: &'static str,
    timestamp: String,
    environment: String,
    version: &'static str,
    uptime_seconds: u64,
    database: &'static str,
    cache: CacheStatus,
}

/// 健康检查
///
/// 缓存不可用时服务仍然正常（读写直接走数据库），因此始终返回 200。
pub async fn health(State(state): State<AppState>) -> Response {
    let database = if state.db.ping().await.is_ok() {
        "connected"
    } else {
        "unreachable"
    };

    Json(HealthInfo {
        status: "success",
        message: "Server is running",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        environment: state.config.server.environment.clone(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        database,
        cache: CacheStatus {
            backend: state.store.backend(),
            available: state.store.is_available(),
        },
    })
    .into_response()
}

/// API 根路径：可用接口一览
pub async fn api_index(State(state): State<AppState>) -> Response {
    let prefix = state.config.server.api_prefix.as_str();
    Json(json!({
        "status": "success",
        "message": "Chapter Performance Dashboard API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoint_map(prefix),
    }))
    .into_response()
}

/// 未匹配路由
pub async fn not_found(State(state): State<AppState>, OriginalUri(uri): OriginalUri) -> Response {
    let prefix = state.config.server.api_prefix.as_str();
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "message": format!("Route {} not found", uri.path()),
            "code": "RESOURCE_NOT_FOUND",
            "availableRoutes": endpoint_map(prefix),
        })),
    )
        .into_response()
}

fn endpoint_map(prefix: &str) -> serde_json::Value {
    json!({
        "health": "GET /health",
        "auth": {
            "register": format!("POST {prefix}/auth/register"),
            "login": format!("POST {prefix}/auth/login"),
            "profile": format!("GET {prefix}/auth/profile"),
            "updateProfile": format!("PUT {prefix}/auth/profile"),
            "logout": format!("POST {prefix}/auth/logout"),
        },
        "chapters": {
            "list": format!("GET {prefix}/chapters"),
            "get": format!("GET {prefix}/chapters/:id"),
            "create": format!("POST {prefix}/chapters"),
            "upload": format!("POST {prefix}/chapters/upload"),
            "update": format!("PUT {prefix}/chapters/:id"),
            "delete": format!("DELETE {prefix}/chapters/:id"),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_map_uses_prefix() {
        let map = endpoint_map("/api/v2");
        assert_eq!(map["chapters"]["upload"], "POST /api/v2/chapters/upload");
        assert_eq!(map["health"], "GET /health");
    }
}
