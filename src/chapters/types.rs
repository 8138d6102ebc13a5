//! # 章节类型定义
//!
//! 枚举取值、元数据结构与对外输出的 JSON 形状

use chrono::NaiveDateTime;
use entity::{chapters, users};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// 合法年级
pub const CLASSES: [&str; 7] = ["6", "7", "8", "9", "10", "11", "12"];

/// 合法学科
pub const SUBJECTS: [&str; 12] = [
    "Mathematics",
    "Physics",
    "Chemistry",
    "Science",
    "English",
    "Hindi",
    "Social Studies",
    "Biology",
    "History",
    "Geography",
    "Economics",
    "Political Science",
];

/// 单元编号范围
pub const UNIT_RANGE: std::ops::RangeInclusive<i64> = 1..=20;

/// 章节状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterStatus {
    Completed,
    InProgress,
    #[default]
    NotStarted,
    UnderReview,
}

impl ChapterStatus {
    pub const ALL: [Self; 4] = [
        Self::Completed,
        Self::InProgress,
        Self::NotStarted,
        Self::UnderReview,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::InProgress => "in-progress",
            Self::NotStarted => "not-started",
            Self::UnderReview => "under-review",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// 按完成度推导状态：100 为已完成，大于 0 为进行中，否则保持原状态
    #[must_use]
    pub const fn with_progress(self, completion_percentage: i32) -> Self {
        if completion_percentage >= 100 {
            Self::Completed
        } else if completion_percentage > 0 {
            Self::InProgress
        } else {
            self
        }
    }
}

/// 难度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == s)
    }
}

/// 题目统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChapterMetadata {
    pub total_questions: u64,
    pub correct_answers: u64,
    pub average_score: f64,
    pub year_wise_question_count: BTreeMap<String, u64>,
}

impl ChapterMetadata {
    /// 正确率（百分比，四舍五入）；没有题目时为 0
    #[must_use]
    pub fn accuracy(&self) -> u64 {
        if self.total_questions == 0 {
            return 0;
        }
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = (self.correct_answers as f64 / self.total_questions as f64 * 100.0).round() as u64;
        pct
    }

    /// 从 JSON 列读取，格式异常时退回默认值
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

/// 校验通过、可直接写入的章节数据
#[derive(Debug, Clone, PartialEq)]
pub struct NewChapter {
    pub title: String,
    pub class: String,
    pub unit: i32,
    pub subject: String,
    pub status: ChapterStatus,
    pub difficulty: Difficulty,
    pub weak_chapters: bool,
    pub description: Option<String>,
    pub topics: Vec<String>,
    pub estimated_duration: Option<i32>,
    pub completion_percentage: i32,
    pub metadata: ChapterMetadata,
}

impl NewChapter {
    /// 写入前的最终状态（应用完成度规则）
    #[must_use]
    pub const fn effective_status(&self) -> ChapterStatus {
        self.status.with_progress(self.completion_percentage)
    }
}

/// 章节创建者摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatorView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<&users::Model> for CreatorView {
    fn from(user: &users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

/// 对外输出的章节
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterView {
    pub id: i32,
    pub title: String,
    pub class: String,
    pub unit: i32,
    pub subject: String,
    pub status: String,
    pub difficulty: String,
    pub weak_chapters: bool,
    pub description: Option<String>,
    pub topics: Value,
    pub estimated_duration: Option<i32>,
    pub completion_percentage: i32,
    pub last_accessed: NaiveDateTime,
    pub created_by: Option<CreatorView>,
    pub metadata: ChapterMetadata,
    pub accuracy: u64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ChapterView {
    #[must_use]
    pub fn new(chapter: chapters::Model, creator: Option<&users::Model>) -> Self {
        let metadata = ChapterMetadata::from_json(&chapter.metadata);
        Self {
            id: chapter.id,
            title: chapter.title,
            class: chapter.class,
            unit: chapter.unit,
            subject: chapter.subject,
            status: chapter.status,
            difficulty: chapter.difficulty,
            weak_chapters: chapter.weak_chapters,
            description: chapter.description,
            topics: chapter.topics,
            estimated_duration: chapter.estimated_duration,
            completion_percentage: chapter.completion_percentage,
            last_accessed: chapter.last_accessed,
            created_by: creator.map(CreatorView::from),
            accuracy: metadata.accuracy(),
            metadata,
            created_at: chapter.created_at,
            updated_at: chapter.updated_at,
        }
    }
}

/// 分页信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_chapters: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
    pub limit: u64,
}

impl Pagination {
    #[must_use]
    pub const fn new(page: u64, limit: u64, total: u64) -> Self {
        let total_pages = total.div_ceil(limit);
        Self {
            current_page: page,
            total_pages,
            total_chapters: total,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
            limit,
        }
    }
}

/// 列表结果
#[derive(Debug, Clone, Serialize)]
pub struct ChapterList {
    pub chapters: Vec<ChapterView>,
    pub pagination: Pagination,
    pub filters: super::query::AppliedFilters,
}

/// 批量上传中成功的条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSuccess {
    pub index: usize,
    pub id: i32,
    pub title: String,
}

/// 批量上传中失败的条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadFailure {
    pub index: usize,
    pub data: Value,
    pub error: String,
}

/// 批量上传汇总
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// 批量上传报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadReport {
    pub summary: UploadSummary,
    pub successful: Vec<UploadSuccess>,
    pub failed: Vec<UploadFailure>,
}

impl UploadReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Upload completed. {} chapters added, {} failed.",
            self.summary.successful, self.summary.failed
        )
    }
}
