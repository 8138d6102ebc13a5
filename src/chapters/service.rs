//! # 章节业务逻辑
//!
//! 列表、详情、创建、批量上传、更新与删除。所有写操作成功后等待缓存失效完成再返回。

use serde_json::Value;

use super::query::ChapterQuery;
use super::repository::ChapterRepository;
use super::types::{
    ChapterList, ChapterView, Pagination, UploadFailure, UploadReport, UploadSuccess,
    UploadSummary,
};
use super::validation::validate_chapter;
use crate::auth::AuthContext;
use crate::cache::CacheInvalidator;
use crate::error::{DashboardError, Result};
use crate::{
    linfo, lwarn,
    logging::{LogComponent, LogStage},
};

/// 解析路径中的章节 ID
pub fn parse_chapter_id(raw: &str) -> Result<i32> {
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| DashboardError::bad_request("Invalid chapter ID"))
}

fn chapter_not_found() -> DashboardError {
    DashboardError::not_found("Chapter not found")
}

/// 章节服务
#[derive(Clone)]
pub struct ChapterService {
    repo: ChapterRepository,
    invalidator: CacheInvalidator,
}

impl ChapterService {
    #[must_use]
    pub const fn new(repo: ChapterRepository, invalidator: CacheInvalidator) -> Self {
        Self { repo, invalidator }
    }

    #[must_use]
    pub const fn repository(&self) -> &ChapterRepository {
        &self.repo
    }

    /// 过滤 + 分页列表
    pub async fn list(&self, query: ChapterQuery) -> Result<ChapterList> {
        let rows = self
            .repo
            .find(&query.filter, query.sort, query.offset(), query.limit)
            .await?;
        let total = self.repo.count(&query.filter).await?;

        Ok(ChapterList {
            chapters: rows
                .into_iter()
                .map(|(chapter, creator)| ChapterView::new(chapter, creator.as_ref()))
                .collect(),
            pagination: Pagination::new(query.page, query.limit, total),
            filters: query.applied,
        })
    }

    pub async fn get(&self, raw_id: &str) -> Result<ChapterView> {
        let id = parse_chapter_id(raw_id)?;
        let (chapter, creator) = self.repo.find_by_id(id).await?.ok_or_else(chapter_not_found)?;
        Ok(ChapterView::new(chapter, creator.as_ref()))
    }

    /// 创建单个章节
    pub async fn create(&self, payload: &Value, actor: &AuthContext) -> Result<ChapterView> {
        let chapter = validate_chapter(payload)
            .map_err(|errors| DashboardError::validation("Validation failed", errors))?;

        let model = self.repo.insert(chapter, Some(actor.user_id)).await?;
        self.after_creator_change(actor.user_id).await;

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Chapters,
            "chapter_created",
            &format!("章节已创建: id={}, by={}", model.id, actor.user_id)
        );

        self.reload(model.id).await
    }

    /// 从 JSON 文件内容批量导入；逐条校验写入，失败条目记录在报告中
    pub async fn upload(&self, file: &[u8], actor: &AuthContext) -> Result<UploadReport> {
        let parsed: Value = serde_json::from_slice(file)
            .map_err(|_| DashboardError::bad_request("Invalid JSON file format"))?;
        let Value::Array(items) = parsed else {
            return Err(DashboardError::bad_request(
                "JSON file must contain an array of chapters",
            ));
        };

        let mut successful = Vec::new();
        let mut failed = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let chapter = match validate_chapter(&item) {
                Ok(chapter) => chapter,
                Err(errors) => {
                    failed.push(UploadFailure {
                        index,
                        data: item,
                        error: errors.join(", "),
                    });
                    continue;
                }
            };

            match self.repo.insert(chapter, Some(actor.user_id)).await {
                Ok(model) => successful.push(UploadSuccess {
                    index,
                    id: model.id,
                    title: model.title,
                }),
                Err(e) => {
                    lwarn!(
                        "system",
                        LogStage::Db,
                        LogComponent::Chapters,
                        "upload_item_failed",
                        &format!("批量导入第 {index} 条写入失败: {e}")
                    );
                    failed.push(UploadFailure {
                        index,
                        data: item,
                        error: e.client_message(),
                    });
                }
            }
        }

        if !successful.is_empty() {
            self.after_creator_change(actor.user_id).await;
        }

        let report = UploadReport {
            summary: UploadSummary {
                total: successful.len() + failed.len(),
                successful: successful.len(),
                failed: failed.len(),
            },
            successful,
            failed,
        };

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Chapters,
            "chapters_uploaded",
            &report.message()
        );

        Ok(report)
    }

    /// 以完整章节数据替换
    pub async fn update(&self, raw_id: &str, payload: &Value) -> Result<ChapterView> {
        let id = parse_chapter_id(raw_id)?;
        let chapter = validate_chapter(payload)
            .map_err(|errors| DashboardError::validation("Validation failed", errors))?;

        self.repo
            .update_by_id(id, chapter)
            .await?
            .ok_or_else(chapter_not_found)?;
        self.invalidator.invalidate_chapters().await;

        self.reload(id).await
    }

    pub async fn delete(&self, raw_id: &str) -> Result<()> {
        let id = parse_chapter_id(raw_id)?;
        let removed = self
            .repo
            .delete_by_id(id)
            .await?
            .ok_or_else(chapter_not_found)?;

        self.invalidator.invalidate_chapters().await;
        if let Some(creator) = removed.created_by {
            self.invalidator.invalidate_user(creator).await;
        }

        linfo!(
            "system",
            LogStage::Db,
            LogComponent::Chapters,
            "chapter_deleted",
            &format!("章节已删除: id={id}")
        );
        Ok(())
    }

    /// 章节集合与创建者资料（章节计数）同时失效
    async fn after_creator_change(&self, user_id: i32) {
        self.invalidator.invalidate_chapters().await;
        self.invalidator.invalidate_user(user_id).await;
    }

    async fn reload(&self, id: i32) -> Result<ChapterView> {
        let (chapter, creator) = self.repo.find_by_id(id).await?.ok_or_else(chapter_not_found)?;
        Ok(ChapterView::new(chapter, creator.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1", Some(1))]
    #[case("42", Some(42))]
    #[case("0", None)]
    #[case("-3", None)]
    #[case("abc", None)]
    #[case("64a1f0c2e4b0", None)]
    fn test_parse_chapter_id(#[case] raw: &str, #[case] expected: Option<i32>) {
        match expected {
            Some(id) => assert_eq!(parse_chapter_id(raw).unwrap(), id),
            None => {
                let err = parse_chapter_id(raw).unwrap_err();
                assert_eq!(err.client_message(), "Invalid chapter ID");
            }
        }
    }
}
