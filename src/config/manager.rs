//! # 配置管理器
//!
//! 统一的配置加载入口：TOML 文件 + 环境变量覆盖 + 校验。

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{AppConfig, CacheBackend, KeyScope, parse_duration_secs, validate_config};
use crate::error::{DashboardError, Result};
use crate::{
    ldebug, linfo, lwarn,
    logging::{LogComponent, LogStage},
};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "DASHBOARD_CONFIG_PATH";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置
    config: Arc<AppConfig>,
    /// 实际加载的配置文件
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 从进程环境创建配置管理器
    ///
    /// 配置文件优先取 `DASHBOARD_CONFIG_PATH`，否则为 `config/config.{RUST_ENV}.toml`。
    pub fn new() -> Result<Self> {
        let config_file = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| {
            let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            format!("config/config.{env}.toml")
        });

        Self::from_file(config_file, env::vars())
    }

    /// 从指定文件与环境变量集合创建配置管理器
    ///
    /// 文件不存在时使用默认配置。
    pub fn from_file(
        config_path: impl AsRef<Path>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let config_path = config_path.as_ref();

        let (contents, source) = if config_path.exists() {
            let contents = std::fs::read_to_string(config_path).map_err(|e| {
                DashboardError::config_with_source(
                    format!("读取配置文件失败: {}", config_path.display()),
                    e,
                )
            })?;
            (Some(contents), Some(config_path.to_path_buf()))
        } else {
            lwarn!(
                "system",
                LogStage::Configuration,
                LogComponent::Config,
                "config_file_missing",
                &format!("配置文件不存在，使用默认配置: {}", config_path.display())
            );
            (None, None)
        };

        let config = Self::build(contents.as_deref(), vars)?;

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_loaded",
            &format!(
                "配置加载完成: env={}, cache_backend={:?}, key_scope={:?}",
                config.server.environment, config.cache.backend, config.cache.key_scope
            )
        );

        Ok(Self {
            config: Arc::new(config),
            source,
        })
    }

    /// 由 TOML 文本与环境变量构建并校验配置
    pub fn build(
        contents: Option<&str>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<AppConfig> {
        let mut config: AppConfig = match contents {
            Some(text) => toml::from_str(text)
                .map_err(|e| DashboardError::config_with_source("TOML解析失败", e))?,
            None => AppConfig::default(),
        };

        let overrides: HashMap<String, String> = vars.into_iter().collect();
        Self::apply_env_overrides(&mut config, &overrides)?;
        validate_config(&config)?;
        Ok(config)
    }

    /// 获取当前配置
    #[must_use]
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 实际加载的配置文件路径
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 应用环境变量覆盖
    fn apply_env_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<()> {
        let mut applied = 0usize;
        for (key, value) in overrides {
            if Self::apply_override_to_config(config, key, value)? {
                applied += 1;
                ldebug!(
                    "system",
                    LogStage::Configuration,
                    LogComponent::Config,
                    "env_override",
                    &format!(
                        "应用环境变量覆盖: {} = {}",
                        key,
                        if key.contains("PASSWORD") || key.contains("SECRET") {
                            "***"
                        } else {
                            value
                        }
                    )
                );
            }
        }

        ldebug!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "env_overrides_applied",
            &format!("环境变量覆盖: {applied} 个")
        );
        Ok(())
    }

    /// 将单个环境变量应用到配置对象，返回是否识别该变量
    fn apply_override_to_config(config: &mut AppConfig, key: &str, value: &str) -> Result<bool> {
        match key {
            "HOST" => config.server.host = value.to_string(),
            "PORT" => config.server.port = parse_number(key, value)?,
            "APP_ENV" => config.server.environment = value.to_string(),
            "DATABASE_URL" => config.database.url = value.to_string(),
            "REDIS_URL" => config.redis.url = value.to_string(),
            "REDIS_PASSWORD" => config.redis.password = Some(value.to_string()),
            "JWT_SECRET" => config.auth.jwt_secret = value.to_string(),
            "JWT_EXPIRE" => config.auth.jwt_expires_in = parse_duration_secs(value)?,
            "RATE_LIMIT_WINDOW_MS" => config.rate_limit.api.window_ms = parse_number(key, value)?,
            "RATE_LIMIT_MAX" => config.rate_limit.api.max = parse_number(key, value)?,
            "MAX_FILE_SIZE" => config.upload.max_file_size = parse_number(key, value)?,
            "UPLOAD_DIR" => config.upload.dir = value.to_string(),
            "CACHE_ENABLED" => config.cache.enabled = parse_number(key, value)?,
            "CACHE_TTL" => config.cache.ttl = parse_number(key, value)?,
            "CACHE_PREFIX" => config.cache.prefix = value.to_string(),
            "CACHE_BACKEND" => {
                config.cache.backend = match value.to_ascii_lowercase().as_str() {
                    "redis" => CacheBackend::Redis,
                    "memory" => CacheBackend::Memory,
                    other => return Err(crate::config_error!("未知的缓存后端: {}", other)),
                };
            }
            "CACHE_KEY_SCOPE" => {
                config.cache.key_scope = match value.to_ascii_lowercase().as_str() {
                    "template" => KeyScope::Template,
                    "resolved" => KeyScope::Resolved,
                    other => return Err(crate::config_error!("未知的缓存键范围: {}", other)),
                };
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.trim().parse().map_err(|e| {
        DashboardError::config_with_source(format!("环境变量 {key} 的值无效: {value}"), e)
    })
}
