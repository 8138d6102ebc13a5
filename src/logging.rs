//! # 日志配置模块
//!
//! 基于 `tracing` 的结构化日志：统一的阶段/组件标签与 `linfo!` 等宏。
//! 所有事件都带 `request_id`、`stage`、`component`、`operation` 四个字段，
//! 后台任务与启动流程使用 `"system"` 作为请求 ID。

use std::env;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 日志阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Shutdown,
    Configuration,
    RequestStart,
    Authentication,
    Cache,
    Db,
    RateLimit,
    Response,
    BackgroundTask,
    HealthCheck,
    Internal,
    Error,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Configuration => "configuration",
            Self::RequestStart => "request_start",
            Self::Authentication => "authentication",
            Self::Cache => "cache",
            Self::Db => "db",
            Self::RateLimit => "rate_limit",
            Self::Response => "response",
            Self::BackgroundTask => "background_task",
            Self::HealthCheck => "health_check",
            Self::Internal => "internal",
            Self::Error => "error",
        }
    }
}

/// 日志组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    ServerSetup,
    Config,
    Database,
    Seeder,
    Cache,
    Interceptor,
    Invalidator,
    Auth,
    Chapters,
    RateLimiter,
    Api,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::ServerSetup => "server_setup",
            Self::Config => "config",
            Self::Database => "database",
            Self::Seeder => "seeder",
            Self::Cache => "cache",
            Self::Interceptor => "cache_interceptor",
            Self::Invalidator => "cache_invalidator",
            Self::Auth => "auth",
            Self::Chapters => "chapters",
            Self::RateLimiter => "rate_limiter",
            Self::Api => "api",
        }
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_event {
    ($level:ident, $request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::$level!(
            request_id = %&$request_id,
            stage = ($stage).as_str(),
            component = ($component).as_str(),
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// 结构化 INFO 日志：`linfo!(request_id, stage, component, operation, message)`
#[macro_export]
macro_rules! linfo {
    ($($arg:tt)*) => { $crate::__log_event!(info, $($arg)*) };
}

/// 结构化 DEBUG 日志
#[macro_export]
macro_rules! ldebug {
    ($($arg:tt)*) => { $crate::__log_event!(debug, $($arg)*) };
}

/// 结构化 WARN 日志
#[macro_export]
macro_rules! lwarn {
    ($($arg:tt)*) => { $crate::__log_event!(warn, $($arg)*) };
}

/// 结构化 ERROR 日志
#[macro_export]
macro_rules! lerror {
    ($($arg:tt)*) => { $crate::__log_event!(error, $($arg)*) };
}

/// 默认过滤规则：关闭 SQL 语句级日志，本 crate 输出 debug
fn default_filter(level: &str) -> String {
    format!("{level},chapter_dashboard=debug,sqlx::query=off,sea_orm::query=warn,sqlx=warn")
}

/// 初始化日志系统
///
/// `RUST_LOG` 优先于默认过滤规则。重复初始化（例如多个测试）会被忽略。
pub fn init_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter(level));

    let initialized = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init()
        .is_ok();

    if initialized {
        tracing::info!("📋 日志系统初始化完成 (level={level})");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_silences_sql() {
        let filter = default_filter("warn");
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("sqlx::query=off"));
        assert!(filter.contains("chapter_dashboard=debug"));
    }

    #[test]
    fn test_labels_are_snake_case() {
        assert_eq!(LogStage::RateLimit.as_str(), "rate_limit");
        assert_eq!(LogComponent::Interceptor.as_str(), "cache_interceptor");
    }

    #[test]
    fn test_macros_expand() {
        init_logging(Some("debug"));
        crate::linfo!("system", LogStage::Startup, LogComponent::Main, "test", "hello");
        crate::lwarn!(
            "req-1",
            LogStage::Cache,
            LogComponent::Cache,
            "test",
            &format!("key={}", "k")
        );
    }
}
