//! # 章节实体定义
//!
//! 章节表的 Sea-ORM 实体模型。`topics` 与 `metadata` 以 JSON 列存储。

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 章节实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "chapters")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    /// 年级，`"6"` 到 `"12"`
    pub class: String,
    pub unit: i32,
    pub subject: String,
    pub status: String,
    pub difficulty: String,
    pub weak_chapters: bool,
    pub description: Option<String>,
    /// 字符串数组
    pub topics: Json,
    /// 预计学习时长（分钟）
    pub estimated_duration: Option<i32>,
    pub completion_percentage: i32,
    pub last_accessed: DateTime,
    pub created_by: Option<i32>,
    /// 题目统计：`{ totalQuestions, correctAnswers, averageScore, yearWiseQuestionCount }`
    pub metadata: Json,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CreatedBy",
        to = "super::users::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
