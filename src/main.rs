//! # Chapter Dashboard 主程序

use std::sync::Arc;

use chapter_dashboard::{
    Result,
    api,
    app::AppContext,
    cache::build_store,
    config::ConfigManager,
    database, lerror, linfo,
    logging::{self, LogComponent, LogStage},
};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging(None);

    if let Err(e) = run().await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务启动失败: {e:?}")
        );
        std::process::exit(1);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}

async fn run() -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let config = config_manager.config();

    let db = Arc::new(database::init_database(&config.database).await?);
    database::run_migrations(&db).await?;

    if config.server.is_development() && config.seed.enabled {
        database::seed(&db, &config.seed, &config.auth).await?;
    }

    let store = build_store(&config).await?;
    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "cache_ready",
        &format!(
            "缓存存储: backend={}, available={}",
            store.backend(),
            store.is_available()
        )
    );

    let context = Arc::new(AppContext::new(config, db, store));
    api::serve(context).await
}
