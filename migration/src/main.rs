use sea_orm_migration::prelude::*;

#[tokio::main]
async fn main() {
    // 未设置 DATABASE_URL 时由 sea-orm-cli 报错提示，迁移目标与服务端配置保持一致：
    // DATABASE_URL=sqlite://data/dashboard.db cargo run -p migration -- up
    cli::run_cli(migration::Migrator).await;
}
