//! # 章节模块
//!
//! 章节数据的校验、持久化与业务逻辑

pub mod query;
pub mod repository;
pub mod service;
pub mod types;
pub mod validation;

pub use query::{ChapterFilter, ChapterQuery, ChapterSort};
pub use repository::ChapterRepository;
pub use service::{ChapterService, parse_chapter_id};
pub use types::{ChapterList, ChapterStatus, ChapterView, Difficulty, NewChapter, UploadReport};
pub use validation::validate_chapter;
