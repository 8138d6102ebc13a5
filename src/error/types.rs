//! # 错误类型定义

use axum::http::StatusCode;
use thiserror::Error;

use super::cache::CacheError;

/// 应用主要错误类型
///
/// `message` 字段是面向客户端的文本；`Display` 额外带有中文分类前缀，用于日志。
#[derive(Debug, Error)]
pub enum DashboardError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 数据库相关错误
    #[error("数据库错误: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 缓存相关错误（不会透传到 HTTP 层）
    #[error("缓存错误: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 认证错误：缺失或无效的凭证
    #[error("认证错误: {message}")]
    Auth {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 权限错误：角色不足
    #[error("权限错误: {message}")]
    Permission { message: String },

    /// 请求数据校验失败
    #[error("校验错误: {message}")]
    Validation { message: String, errors: Vec<String> },

    /// 其它 400 类错误
    #[error("请求错误: {message}")]
    BadRequest { message: String },

    /// 资源未找到
    #[error("资源未找到: {message}")]
    NotFound { message: String },

    /// 速率限制
    #[error("速率限制: {message}")]
    RateLimit { message: String, retry_after: u64 },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 系统内部错误
    #[error("内部错误: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 服务器启动错误
    #[error("服务器启动错误: {message}")]
    ServerStart {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl DashboardError {
    /// 将错误转换为HTTP状态码和错误代码
    #[must_use]
    pub const fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Self::Database { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            Self::Cache { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            Self::Auth { .. } => (StatusCode::UNAUTHORIZED, "AUTH_ERROR"),
            Self::Permission { .. } => (StatusCode::FORBIDDEN, "PERMISSION_ERROR"),
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest { .. } => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND"),
            Self::RateLimit { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            Self::Serialization { .. } => (StatusCode::BAD_REQUEST, "SERIALIZATION_ERROR"),
            Self::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Self::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            Self::ServerStart { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_START_ERROR"),
        }
    }

    /// 面向客户端的错误文本，服务端错误不暴露内部细节
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::Auth { message, .. }
            | Self::Permission { message }
            | Self::Validation { message, .. }
            | Self::BadRequest { message }
            | Self::NotFound { message }
            | Self::RateLimit { message, .. }
            | Self::Serialization { message, .. } => message.clone(),
            _ => "Internal server error".to_string(),
        }
    }

    /// 是否属于客户端错误（4xx）
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.to_http_response_parts().0.is_client_error()
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建数据库错误
    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的数据库错误
    pub fn database_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的缓存错误
    pub fn cache_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Cache {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建认证错误
    pub fn auth<T: Into<String>>(message: T) -> Self {
        Self::Auth {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的认证错误
    pub fn auth_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Auth {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建权限错误
    pub fn permission<T: Into<String>>(message: T) -> Self {
        Self::Permission {
            message: message.into(),
        }
    }

    /// 创建校验错误
    pub fn validation<T: Into<String>>(message: T, errors: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    /// 创建请求错误
    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// 创建资源未找到错误
    pub fn not_found<T: Into<String>>(message: T) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// 创建速率限制错误
    pub fn rate_limit<T: Into<String>>(message: T, retry_after: u64) -> Self {
        Self::RateLimit {
            message: message.into(),
            retry_after,
        }
    }

    /// 创建内部错误
    pub fn internal<T: Into<String>>(message: T) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的内部错误
    pub fn internal_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的服务器启动错误
    pub fn server_start_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::ServerStart {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

impl From<std::io::Error> for DashboardError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<toml::de::Error> for DashboardError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "Invalid JSON payload".to_string(),
            source: err.into(),
        }
    }
}

impl From<sea_orm::error::DbErr> for DashboardError {
    fn from(err: sea_orm::error::DbErr) -> Self {
        Self::database_with_source("数据库操作失败", err)
    }
}

impl From<CacheError> for DashboardError {
    fn from(err: CacheError) -> Self {
        Self::cache_with_source("缓存操作失败", err)
    }
}

// Bcrypt错误转换
impl From<bcrypt::BcryptError> for DashboardError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::internal_with_source("密码处理失败", err)
    }
}

// JWT错误转换
impl From<jsonwebtoken::errors::Error> for DashboardError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::auth_with_source("Invalid or expired token", err)
    }
}
