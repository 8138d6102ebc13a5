//! # Chapter Dashboard Library
//!
//! 章节学习进度仪表盘 API：章节 CRUD、JWT 认证与角色，
//! 以及基于 Redis 的读穿透响应缓存与模式失效。

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod chapters;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod rate_limit;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{DashboardError, Result};
