//! # 章节列表查询参数
//!
//! 过滤条件、分页与排序的解析与校验

use serde::Serialize;
use serde_json::Value;

use super::types::{CLASSES, ChapterStatus, Difficulty, SUBJECTS, UNIT_RANGE};
use crate::cache::QueryParams;
use crate::error::{DashboardError, Result};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// 排序字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Class,
    Unit,
    Status,
    CreatedAt,
}

/// 排序方式：`field` 升序，`-field` 降序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterSort {
    pub field: SortField,
    pub descending: bool,
}

impl Default for ChapterSort {
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl ChapterSort {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (descending, name) = raw
            .strip_prefix('-')
            .map_or((false, raw), |rest| (true, rest));
        let field = match name {
            "title" => SortField::Title,
            "class" => SortField::Class,
            "unit" => SortField::Unit,
            "status" => SortField::Status,
            "createdAt" => SortField::CreatedAt,
            _ => return None,
        };
        Some(Self { field, descending })
    }
}

/// 数据库层过滤条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterFilter {
    pub class: Option<String>,
    pub unit: Option<i32>,
    pub status: Option<ChapterStatus>,
    pub subject: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub weak_chapters: Option<bool>,
    /// 在标题与描述中做子串匹配
    pub search: Option<String>,
}

/// 原样回显给客户端的过滤参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weak_chapters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// 解析后的列表请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterQuery {
    pub filter: ChapterFilter,
    pub sort: ChapterSort,
    pub page: u64,
    pub limit: u64,
    pub applied: AppliedFilters,
}

impl Default for ChapterQuery {
    fn default() -> Self {
        Self {
            filter: ChapterFilter::default(),
            sort: ChapterSort::default(),
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
            applied: AppliedFilters::default(),
        }
    }
}

impl ChapterQuery {
    /// 从查询参数解析，未知参数被忽略，所有错误一次性返回
    pub fn from_params(params: &QueryParams) -> Result<Self> {
        let mut errors = Vec::new();
        let mut query = Self::default();

        let mut single = |name: &str| -> Option<String> {
            match params.get(name)? {
                Value::String(s) => {
                    let s = s.trim();
                    (!s.is_empty()).then(|| s.to_string())
                }
                _ => {
                    errors.push(format!("\"{name}\" must be a single value"));
                    None
                }
            }
        };

        let class = single("class");
        let unit = single("unit");
        let status = single("status");
        let subject = single("subject");
        let weak = single("weakChapters");
        let difficulty = single("difficulty");
        let search = single("search");
        let page = single("page");
        let limit = single("limit");
        let sort = single("sort");

        if let Some(class) = &class {
            if CLASSES.contains(&class.as_str()) {
                query.filter.class = Some(class.clone());
            } else {
                errors.push(format!("\"class\" must be one of [{}]", CLASSES.join(", ")));
            }
        }

        if let Some(unit) = &unit {
            match unit.parse::<i64>() {
                Ok(n) if UNIT_RANGE.contains(&n) => query.filter.unit = i32::try_from(n).ok(),
                _ => errors.push("\"unit\" must be an integer between 1 and 20".to_string()),
            }
        }

        if let Some(status) = &status {
            match ChapterStatus::parse(status) {
                Some(s) => query.filter.status = Some(s),
                None => errors.push(
                    "\"status\" must be one of [completed, in-progress, not-started, under-review]"
                        .to_string(),
                ),
            }
        }

        if let Some(subject) = &subject {
            if SUBJECTS.contains(&subject.as_str()) {
                query.filter.subject = Some(subject.clone());
            } else {
                errors.push("\"subject\" is not a valid subject".to_string());
            }
        }

        if let Some(weak) = &weak {
            match weak.as_str() {
                "true" => query.filter.weak_chapters = Some(true),
                "false" => query.filter.weak_chapters = Some(false),
                _ => errors.push("\"weakChapters\" must be one of [true, false]".to_string()),
            }
        }

        if let Some(difficulty) = &difficulty {
            match Difficulty::parse(difficulty) {
                Some(d) => query.filter.difficulty = Some(d),
                None => errors.push("\"difficulty\" must be one of [easy, medium, hard]".to_string()),
            }
        }

        query.filter.search.clone_from(&search);

        if let Some(page) = &page {
            match page.parse::<u64>() {
                Ok(n) if n >= 1 => query.page = n,
                _ => errors.push("\"page\" must be an integer greater than or equal to 1".to_string()),
            }
        }

        if let Some(limit) = &limit {
            match limit.parse::<u64>() {
                Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => query.limit = n,
                _ => errors.push(format!(
                    "\"limit\" must be an integer between 1 and {MAX_PAGE_SIZE}"
                )),
            }
        }

        if let Some(sort) = &sort {
            match ChapterSort::parse(sort) {
                Some(s) => query.sort = s,
                None => errors.push(
                    "\"sort\" must be one of [title, class, unit, status, createdAt] with optional '-' prefix"
                        .to_string(),
                ),
            }
        }

        if !errors.is_empty() {
            return Err(DashboardError::validation("Validation error", errors));
        }

        query.applied = AppliedFilters {
            class,
            unit,
            status,
            subject,
            weak_chapters: weak,
            difficulty,
            search,
        };
        Ok(query)
    }

    /// 分页偏移量
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page - 1) * self.limit
    }
}
