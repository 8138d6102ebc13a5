//! # 用户角色定义
//!
//! 系统中的三种基本用户角色

use serde::{Deserialize, Serialize};
use std::fmt;

/// 用户角色枚举
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// 管理员
    Admin,
    /// 教师
    Teacher,
    /// 学生
    #[default]
    Student,
}

impl UserRole {
    /// 获取角色的字符串表示
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Teacher => "teacher",
            Self::Student => "student",
        }
    }

    /// 从字符串解析角色
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "teacher" => Some(Self::Teacher),
            "student" => Some(Self::Student),
            _ => None,
        }
    }

    /// 检查是否为管理员
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }

    /// 获取角色的描述
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Admin => "管理员 - 可以创建、上传、修改和删除章节",
            Self::Teacher => "教师 - 浏览章节",
            Self::Student => "学生 - 浏览章节",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| "Role must be admin, teacher, or student".to_string())
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
