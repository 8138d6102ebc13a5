//! # 请求处理器

pub mod auth;
pub mod chapters;
pub mod system;
