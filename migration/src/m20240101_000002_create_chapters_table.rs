use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Chapters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Chapters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Chapters::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Chapters::Class).string_len(2).not_null())
                    .col(ColumnDef::new(Chapters::Unit).integer().not_null())
                    .col(ColumnDef::new(Chapters::Subject).string_len(50).not_null())
                    .col(
                        ColumnDef::new(Chapters::Status)
                            .string_len(20)
                            .not_null()
                            .default("not-started"),
                    )
                    .col(
                        ColumnDef::new(Chapters::Difficulty)
                            .string_len(10)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Chapters::WeakChapters)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Chapters::Description).string_len(1000))
                    .col(ColumnDef::new(Chapters::Topics).json().not_null())
                    .col(ColumnDef::new(Chapters::EstimatedDuration).integer())
                    .col(
                        ColumnDef::new(Chapters::CompletionPercentage)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Chapters::LastAccessed)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Chapters::CreatedBy).integer())
                    .col(ColumnDef::new(Chapters::Metadata).json().not_null())
                    .col(
                        ColumnDef::new(Chapters::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Chapters::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chapters_created_by")
                            .from(Chapters::Table, Chapters::CreatedBy)
                            .to(Users::Table, Users::Id)
                            .on_update(ForeignKeyAction::Cascade)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // 列表查询常用的过滤组合
        manager
            .create_index(
                Index::create()
                    .name("idx_chapters_class_subject")
                    .table(Chapters::Table)
                    .col(Chapters::Class)
                    .col(Chapters::Subject)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chapters_status")
                    .table(Chapters::Table)
                    .col(Chapters::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_chapters_created_by")
                    .table(Chapters::Table)
                    .col(Chapters::CreatedBy)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Chapters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Chapters {
    Table,
    Id,
    Title,
    Class,
    Unit,
    Subject,
    Status,
    Difficulty,
    WeakChapters,
    Description,
    Topics,
    EstimatedDuration,
    CompletionPercentage,
    LastAccessed,
    CreatedBy,
    Metadata,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
