//! # Entity 模块
//!
//! 包含所有 Sea-ORM 实体定义

pub mod chapters;
pub mod users;

pub use chapters::Entity as Chapters;
pub use users::Entity as Users;
