//! # API 响应结构
//!
//! 统一的 JSON 响应格式：成功为 `{status:"success", message?, data?}`，
//! 失败为 `{status:"error", message, code, errors?, retryAfter?}`。

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::DashboardError;
use crate::{
    lerror,
    logging::{LogComponent, LogStage},
};

/// # 标准成功响应
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// # 标准错误响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: &'static str,
    pub message: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// # 便捷函数：成功响应
pub fn success<T: Serialize>(data: T) -> Response {
    (
        StatusCode::OK,
        Json(SuccessResponse {
            status: "success",
            message: None,
            data: Some(data),
        }),
    )
        .into_response()
}

/// # 便捷函数：带消息与状态码的成功响应
pub fn success_with_message<T: Serialize>(status: StatusCode, data: T, message: &str) -> Response {
    (
        status,
        Json(SuccessResponse {
            status: "success",
            message: Some(message.to_string()),
            data: Some(data),
        }),
    )
        .into_response()
}

/// # 便捷函数：无数据体的成功响应
pub fn success_without_data(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(SuccessResponse::<()> {
            status: "success",
            message: Some(message.to_string()),
            data: None,
        }),
    )
        .into_response()
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let (status, code) = self.to_http_response_parts();

        if status.is_server_error() {
            lerror!(
                "system",
                LogStage::Error,
                LogComponent::Api,
                "request_failed",
                &format!("请求处理失败: {self:?}")
            );
        }

        let retry_after = match &self {
            Self::RateLimit { retry_after, .. } => Some(*retry_after),
            _ => None,
        };
        let errors = match &self {
            Self::Validation { errors, .. } if !errors.is_empty() => Some(errors.clone()),
            _ => None,
        };

        let body = ErrorResponse {
            status: "error",
            message: self.client_message(),
            code,
            errors,
            retry_after,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
