//! # 应用配置结构定义

use serde::{Deserialize, Serialize};

use super::DatabaseConfig;
use crate::error::{DashboardError, Result};

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: DatabaseConfig,
    /// Redis 连接配置
    pub redis: RedisConfig,
    /// 认证配置
    pub auth: AuthConfig,
    /// 响应缓存配置
    pub cache: CacheConfig,
    /// 限流配置
    pub rate_limit: RateLimitConfig,
    /// 文件上传配置
    pub upload: UploadConfig,
    /// 开发环境种子数据
    pub seed: SeedConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 运行环境：`development` / `production` / `test`
    pub environment: String,
    /// API 前缀
    pub api_prefix: String,
    /// 允许的CORS源地址，`*` 表示任意
    pub cors_origins: Vec<String>,
    /// JSON 请求体上限（字节）
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: "development".to_string(),
            api_prefix: "/api/v1".to_string(),
            cors_origins: vec!["*".to_string()],
            body_limit: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 监听地址 `host:port`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Redis配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Redis连接URL
    pub url: String,
    /// 连接密码（可选，URL 中未包含密码时生效）
    pub password: Option<String>,
    /// 连接超时时间（秒）
    pub connection_timeout: u64,
    /// 单条命令超时时间（毫秒）
    pub command_timeout_ms: u64,
    /// 健康探测间隔（秒）
    pub health_check_interval: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            password: None,
            connection_timeout: 5,
            command_timeout_ms: 1000,
            health_check_interval: 10,
        }
    }
}

impl RedisConfig {
    /// 构建 Redis 连接 URL，必要时注入密码
    pub fn build_url(&self) -> Result<String> {
        let mut url = url::Url::parse(&self.url).map_err(|e| {
            DashboardError::config_with_source(format!("无效的 Redis URL: {}", self.url), e)
        })?;

        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            if url.password().is_none() {
                url.set_password(Some(password))
                    .map_err(|()| DashboardError::config("Redis URL 不支持设置密码"))?;
            }
        }

        Ok(url.to_string())
    }
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT 签名密钥（必填）
    pub jwt_secret: String,
    /// 访问令牌有效期（秒）
    pub jwt_expires_in: i64,
    /// bcrypt 计算强度
    pub bcrypt_cost: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_expires_in: 24 * 60 * 60,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// 缓存存储后端
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Redis 服务器
    #[default]
    Redis,
    /// 进程内存储（单实例部署与测试）
    Memory,
}

/// 缓存键中路由标识的取值方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyScope {
    /// 路由模板，例如 `/chapters/{id}`；同一模板的所有资源共享键
    Template,
    /// 实际请求路径，例如 `/chapters/42`
    #[default]
    Resolved,
}

/// 响应缓存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 是否启用响应缓存
    pub enabled: bool,
    /// 存储后端
    pub backend: CacheBackend,
    /// 默认过期时间（秒）
    pub ttl: u64,
    /// 个人资料缓存过期时间（秒）
    pub profile_ttl: u64,
    /// 键前缀
    pub prefix: String,
    /// 路由标识取值方式
    pub key_scope: KeyScope,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackend::Redis,
            ttl: 3600,
            profile_ttl: 300,
            prefix: "chapter_dashboard:".to_string(),
            key_scope: KeyScope::Resolved,
        }
    }
}

/// 单个限流策略：固定窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// 窗口长度（毫秒）
    pub window_ms: u64,
    /// 窗口内允许的最大请求数
    pub max: u64,
}

impl RateLimitPolicy {
    #[must_use]
    pub const fn new(window_ms: u64, max: u64) -> Self {
        Self { window_ms, max }
    }

    /// 窗口长度（秒），至少 1 秒
    #[must_use]
    pub const fn window_secs(&self) -> u64 {
        let secs = self.window_ms.div_ceil(1000);
        if secs == 0 { 1 } else { secs }
    }
}

/// 限流配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// 普通 API
    pub api: RateLimitPolicy,
    /// 注册与登录
    pub auth: RateLimitPolicy,
    /// 文件上传
    pub upload: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api: RateLimitPolicy::new(60_000, 30),
            auth: RateLimitPolicy::new(15 * 60_000, 5),
            upload: RateLimitPolicy::new(60_000, 3),
        }
    }
}

/// 文件上传配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 上传目录，同时以 `/uploads` 静态暴露
    pub dir: String,
    /// 单个文件上限（字节）
    pub max_file_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: "uploads".to_string(),
            max_file_size: 5 * 1024 * 1024,
        }
    }
}

/// 开发环境种子数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    pub enabled: bool,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_password: String,
    /// 章节 JSON 数组文件，缺省不导入
    pub chapters_file: Option<String>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            admin_name: "Admin User".to_string(),
            admin_email: "admin@dashboard.com".to_string(),
            admin_password: "admin123".to_string(),
            chapters_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_deployment_values() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.cache.ttl, 3600);
        assert_eq!(config.cache.prefix, "chapter_dashboard:");
        assert_eq!(config.rate_limit.api, RateLimitPolicy::new(60_000, 30));
        assert_eq!(config.upload.max_file_size, 5 * 1024 * 1024);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [cache]
            backend = "memory"
            key_scope = "template"

            [auth]
            jwt_secret = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.key_scope, KeyScope::Template);
        assert_eq!(config.cache.ttl, 3600);
        assert_eq!(config.server.api_prefix, "/api/v1");
    }

    #[test]
    fn test_redis_build_url_injects_password() {
        let config = RedisConfig {
            url: "redis://cache.internal:6380/2".to_string(),
            password: Some("s3cret".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.build_url().unwrap(),
            "redis://:s3cret@cache.internal:6380/2"
        );

        let config = RedisConfig {
            url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.build_url().is_err());
    }

    #[test]
    fn test_window_secs_rounds_up() {
        assert_eq!(RateLimitPolicy::new(60_000, 1).window_secs(), 60);
        assert_eq!(RateLimitPolicy::new(1_500, 1).window_secs(), 2);
        assert_eq!(RateLimitPolicy::new(0, 1).window_secs(), 1);
    }
}
