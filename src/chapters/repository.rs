//! # 章节持久化
//!
//! Sea-ORM 查询封装：过滤、排序、分页，以及连带创建者信息的读取

use chrono::Utc;
use entity::{chapters, users};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value;
use std::sync::Arc;

use super::query::{ChapterFilter, ChapterSort, SortField};
use super::types::NewChapter;
use crate::error::Result;

/// 章节及其创建者
pub type ChapterWithCreator = (chapters::Model, Option<users::Model>);

/// 章节仓库
#[derive(Clone)]
pub struct ChapterRepository {
    db: Arc<DatabaseConnection>,
}

impl ChapterRepository {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn condition(filter: &ChapterFilter) -> Condition {
        let mut cond = Condition::all();
        if let Some(class) = &filter.class {
            cond = cond.add(chapters::Column::Class.eq(class.as_str()));
        }
        if let Some(unit) = filter.unit {
            cond = cond.add(chapters::Column::Unit.eq(unit));
        }
        if let Some(status) = filter.status {
            cond = cond.add(chapters::Column::Status.eq(status.as_str()));
        }
        if let Some(subject) = &filter.subject {
            cond = cond.add(chapters::Column::Subject.eq(subject.as_str()));
        }
        if let Some(difficulty) = filter.difficulty {
            cond = cond.add(chapters::Column::Difficulty.eq(difficulty.as_str()));
        }
        if let Some(weak) = filter.weak_chapters {
            cond = cond.add(chapters::Column::WeakChapters.eq(weak));
        }
        if let Some(search) = &filter.search {
            cond = cond.add(
                Condition::any()
                    .add(chapters::Column::Title.contains(search.as_str()))
                    .add(chapters::Column::Description.contains(search.as_str())),
            );
        }
        cond
    }

    const fn sort_column(field: SortField) -> chapters::Column {
        match field {
            SortField::Title => chapters::Column::Title,
            SortField::Class => chapters::Column::Class,
            SortField::Unit => chapters::Column::Unit,
            SortField::Status => chapters::Column::Status,
            SortField::CreatedAt => chapters::Column::CreatedAt,
        }
    }

    /// 按条件分页查询
    pub async fn find(
        &self,
        filter: &ChapterFilter,
        sort: ChapterSort,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<ChapterWithCreator>> {
        let order = if sort.descending { Order::Desc } else { Order::Asc };
        let rows = chapters::Entity::find()
            .filter(Self::condition(filter))
            .order_by(Self::sort_column(sort.field), order.clone())
            .order_by(chapters::Column::Id, order)
            .offset(offset)
            .limit(limit)
            .find_also_related(users::Entity)
            .all(self.db.as_ref())
            .await?;
        Ok(rows)
    }

    /// 满足条件的总数
    pub async fn count(&self, filter: &ChapterFilter) -> Result<u64> {
        Ok(chapters::Entity::find()
            .filter(Self::condition(filter))
            .count(self.db.as_ref())
            .await?)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<ChapterWithCreator>> {
        Ok(chapters::Entity::find_by_id(id)
            .find_also_related(users::Entity)
            .one(self.db.as_ref())
            .await?)
    }

    /// 写入新章节
    pub async fn insert(&self, chapter: NewChapter, created_by: Option<i32>) -> Result<chapters::Model> {
        let now = Utc::now().naive_utc();
        let mut active = active_model(chapter);
        active.created_by = Set(created_by);
        active.last_accessed = Set(now);
        active.created_at = Set(now);
        active.updated_at = Set(now);
        Ok(active.insert(self.db.as_ref()).await?)
    }

    /// 整体替换章节内容，保留创建者与创建时间；不存在时返回 `None`
    pub async fn update_by_id(&self, id: i32, chapter: NewChapter) -> Result<Option<chapters::Model>> {
        let Some(existing) = chapters::Entity::find_by_id(id).one(self.db.as_ref()).await? else {
            return Ok(None);
        };

        let mut active = active_model(chapter);
        active.id = ActiveValue::Unchanged(existing.id);
        active.updated_at = Set(Utc::now().naive_utc());
        Ok(Some(active.update(self.db.as_ref()).await?))
    }

    /// 删除章节，返回被删除的记录
    pub async fn delete_by_id(&self, id: i32) -> Result<Option<chapters::Model>> {
        let Some(existing) = chapters::Entity::find_by_id(id).one(self.db.as_ref()).await? else {
            return Ok(None);
        };
        chapters::Entity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        Ok(Some(existing))
    }

    /// 某用户创建的章节数
    pub async fn count_by_creator(&self, user_id: i32) -> Result<u64> {
        Ok(chapters::Entity::find()
            .filter(chapters::Column::CreatedBy.eq(user_id))
            .count(self.db.as_ref())
            .await?)
    }

    /// 章节总数
    pub async fn count_all(&self) -> Result<u64> {
        Ok(chapters::Entity::find().count(self.db.as_ref()).await?)
    }
}

/// 内容字段的 ActiveModel（状态已应用完成度规则）
fn active_model(chapter: NewChapter) -> chapters::ActiveModel {
    let status = chapter.effective_status();
    chapters::ActiveModel {
        title: Set(chapter.title),
        class: Set(chapter.class),
        unit: Set(chapter.unit),
        subject: Set(chapter.subject),
        status: Set(status.as_str().to_string()),
        difficulty: Set(chapter.difficulty.as_str().to_string()),
        weak_chapters: Set(chapter.weak_chapters),
        description: Set(chapter.description),
        topics: Set(Value::from(chapter.topics)),
        estimated_duration: Set(chapter.estimated_duration),
        completion_percentage: Set(chapter.completion_percentage),
        metadata: Set(serde_json::to_value(&chapter.metadata).unwrap_or(Value::Null)),
        ..Default::default()
    }
}
