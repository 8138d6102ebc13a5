//! # 配置管理模块
//!
//! 处理应用配置加载、验证和管理

mod app_config;
mod database;
mod manager;

pub use app_config::{
    AppConfig, AuthConfig, CacheBackend, CacheConfig, KeyScope, RateLimitConfig, RateLimitPolicy,
    RedisConfig, SeedConfig, ServerConfig, UploadConfig,
};
pub use database::DatabaseConfig;
pub use manager::ConfigManager;

use crate::ensure_config;
use crate::error::Result;

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<()> {
    ensure_config!(
        !config.auth.jwt_secret.trim().is_empty(),
        "JWT_SECRET is required"
    );
    ensure_config!(config.auth.jwt_expires_in > 0, "JWT 有效期必须大于0");
    ensure_config!(
        config.server.port != 0,
        "无效的服务器端口: {}",
        config.server.port
    );
    ensure_config!(
        config.server.api_prefix.starts_with('/'),
        "API 前缀必须以 / 开头: {}",
        config.server.api_prefix
    );
    ensure_config!(!config.database.url.is_empty(), "数据库URL不能为空");
    ensure_config!(
        config.database.max_connections > 0,
        "数据库最大连接数必须大于0"
    );
    ensure_config!(!config.cache.prefix.is_empty(), "缓存键前缀不能为空");
    ensure_config!(config.cache.ttl > 0, "缓存过期时间必须大于0");
    ensure_config!(
        config.redis.command_timeout_ms > 0,
        "Redis 命令超时必须大于0"
    );

    for (name, policy) in [
        ("api", &config.rate_limit.api),
        ("auth", &config.rate_limit.auth),
        ("upload", &config.rate_limit.upload),
    ] {
        ensure_config!(
            policy.max > 0 && policy.window_ms > 0,
            "限流策略 {} 的窗口与上限必须大于0",
            name
        );
    }

    ensure_config!(config.upload.max_file_size > 0, "上传文件上限必须大于0");
    Ok(())
}

/// 解析时长字符串为秒：`"3600"`、`"30s"`、`"30m"`、`"24h"`、`"7d"`
pub fn parse_duration_secs(value: &str) -> Result<i64> {
    let value = value.trim();
    let (number, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c)),
        Some(_) => (value, None),
        None => return Err(crate::config_error!("时长不能为空")),
    };

    let amount: i64 = number
        .trim()
        .parse()
        .map_err(|e| crate::error::DashboardError::config_with_source(format!("无效的时长: {value}"), e))?;

    let multiplier = match unit {
        None | Some('s') => 1,
        Some('m') => 60,
        Some('h') => 60 * 60,
        Some('d') => 24 * 60 * 60,
        Some(other) => return Err(crate::config_error!("不支持的时长单位: {}", other)),
    };

    Ok(amount * multiplier)
}
