use thiserror::Error;

/// 描述缓存存储及 Redis 相关的错误。
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("缓存配置错误: {0}")]
    Config(String),

    #[error("缓存存储不可用")]
    Unavailable,

    #[error("缓存命令超时: {operation} 超过 {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("无效的键模式: {0}")]
    InvalidPattern(String),

    #[error("缓存响应异常: {0}")]
    UnexpectedResponse(String),

    #[error("Redis 客户端错误: {0}")]
    Redis(#[from] redis::RedisError),
}

impl CacheError {
    /// 便捷构造函数，统一字符串转换。
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    pub fn unexpected_response(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse(message.into())
    }

    /// 该错误是否意味着连接已断开（需要标记存储不可用）
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Unavailable | Self::Timeout { .. } => true,
            Self::Redis(err) => {
                err.is_io_error()
                    || err.is_connection_dropped()
                    || err.is_connection_refusal()
                    || err.is_timeout()
            }
            _ => false,
        }
    }
}
