//! # 数据库模块
//!
//! 数据库连接、迁移与开发环境种子数据

use chrono::Utc;
use entity::{users, users::Entity as Users};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::UserRole;
use crate::chapters::{ChapterRepository, validate_chapter};
use crate::config::{AuthConfig, DatabaseConfig, SeedConfig};
use crate::error::{DashboardError, Result};
use crate::{
    linfo, lwarn,
    logging::{LogComponent, LogStage},
};

/// 初始化数据库连接
pub async fn init_database(config: &DatabaseConfig) -> Result<DatabaseConnection> {
    config.ensure_database_path()?;

    let mut options = ConnectOptions::new(config.url.clone());
    options
        .connect_timeout(Duration::from_secs(config.connect_timeout))
        .sqlx_logging(false);
    // 每个内存库连接都是独立的数据库，只能使用单连接
    if config.is_memory() {
        options.max_connections(1).min_connections(1);
    } else {
        options.max_connections(config.max_connections);
    }

    let db = Database::connect(options)
        .await
        .map_err(|e| DashboardError::database_with_source("数据库连接失败", e))?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "db_connected",
        &format!("数据库连接成功: {}", redact_url(&config.url))
    );
    Ok(db)
}

/// 运行数据库迁移
pub async fn run_migrations(db: &DatabaseConnection) -> Result<()> {
    ::migration::Migrator::up(db, None)
        .await
        .map_err(|e| DashboardError::database_with_source("数据库迁移失败", e))?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "migrations_applied",
        "数据库迁移完成"
    );
    Ok(())
}

/// 种子结果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedOutcome {
    pub admin_created: bool,
    pub chapters_imported: usize,
}

/// 开发环境种子数据：默认管理员，以及章节表为空时从 JSON 文件导入章节
pub async fn seed(
    db: &Arc<DatabaseConnection>,
    seed: &SeedConfig,
    auth: &AuthConfig,
) -> Result<SeedOutcome> {
    let mut outcome = SeedOutcome::default();
    let admin_id = match Users::find()
        .filter(users::Column::Email.eq(seed.admin_email.as_str()))
        .one(db.as_ref())
        .await?
    {
        Some(admin) => admin.id,
        None => {
            let now = Utc::now().naive_utc();
            let admin = users::ActiveModel {
                name: Set(seed.admin_name.clone()),
                email: Set(seed.admin_email.to_lowercase()),
                password_hash: Set(bcrypt::hash(&seed.admin_password, auth.bcrypt_cost)?),
                role: Set(UserRole::Admin.as_str().to_string()),
                is_active: Set(true),
                profile: Set(None),
                last_login: Set(None),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db.as_ref())
            .await?;
            outcome.admin_created = true;
            linfo!(
                "system",
                LogStage::Startup,
                LogComponent::Seeder,
                "admin_created",
                &format!("默认管理员已创建: {}", admin.email)
            );
            admin.id
        }
    };

    let Some(path) = seed.chapters_file.as_deref() else {
        return Ok(outcome);
    };

    let repo = ChapterRepository::new(Arc::clone(db));
    if repo.count_all().await? > 0 {
        return Ok(outcome);
    }

    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) => {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::Seeder,
                "seed_file_unreadable",
                &format!("无法读取章节种子文件 {path}: {e}")
            );
            return Ok(outcome);
        }
    };

    let items = match serde_json::from_slice::<Value>(&contents)? {
        Value::Array(items) => items,
        _ => {
            return Err(DashboardError::config(format!(
                "章节种子文件必须是 JSON 数组: {path}"
            )));
        }
    };

    for (index, item) in items.iter().enumerate() {
        match validate_chapter(item) {
            Ok(chapter) => {
                repo.insert(chapter, Some(admin_id)).await?;
                outcome.chapters_imported += 1;
            }
            Err(errors) => lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::Seeder,
                "seed_item_skipped",
                &format!("跳过第 {index} 条种子章节: {}", errors.join(", "))
            ),
        }
    }

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Seeder,
        "chapters_seeded",
        &format!("已导入 {} 条种子章节", outcome.chapters_imported)
    );
    Ok(outcome)
}

/// 隐藏连接串中的密码
fn redact_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            let _ = url.set_password(Some("***"));
            url.to_string()
        }
        _ => raw.to_string(),
    }
}
