//! # 认证类型定义
//!
//! JWT 载荷、请求上下文与认证接口的请求/响应结构

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::permissions::UserRole;

/// 令牌签发者
pub const TOKEN_ISSUER: &str = "chapter-dashboard";
/// 令牌受众
pub const TOKEN_AUDIENCE: &str = "chapter-dashboard-users";

/// JWT 载荷
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// 用户ID
    pub sub: String,
    /// 邮箱
    pub email: String,
    /// 角色
    pub role: UserRole,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
    /// 受众
    pub aud: String,
    /// JWT ID
    pub jti: String,
}

impl JwtClaims {
    /// 创建新的 JWT 载荷
    #[must_use]
    pub fn new(user_id: i32, email: String, role: UserRole, expires_in_seconds: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            role,
            iat: now,
            exp: now + expires_in_seconds,
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// 检查 JWT 是否过期
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// 获取用户ID
    pub fn user_id(&self) -> Result<i32, std::num::ParseIntError> {
        self.sub.parse()
    }
}

/// 已认证调用方，由认证中间件写入请求扩展（`Arc<AuthContext>`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: i32,
    pub email: String,
    pub role: UserRole,
}

impl AuthContext {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// 从 `Authorization` 头提取 Bearer 令牌
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// 注册请求
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub profile: Option<Value>,
}

/// 登录请求
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// 资料更新请求
///
/// 只接受 `name` 与 `profile`，其它字段（密码、角色、邮箱）被忽略。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile: Option<Value>,
}

/// 对外展示的用户信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub profile: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapters_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl From<&entity::users::Model> for UserView {
    fn from(user: &entity::users::Model) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            profile: user.profile.clone(),
            is_active: None,
            last_login: None,
            chapters_count: None,
            created_at: None,
        }
    }
}

/// 注册/登录结果：用户信息 + 访问令牌
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: UserView,
    pub token: String,
}
