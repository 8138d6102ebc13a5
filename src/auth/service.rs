//! Authentication service
//!
//! 用户注册、登录、资料读取/更新，以及请求令牌到 `AuthContext` 的解析

use bcrypt::{hash, verify};
use chrono::Utc;
use entity::{users, users::Entity as Users};
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
};
use serde_json::{Map, Value};
use std::sync::{Arc, LazyLock};

use crate::auth::jwt::JwtManager;
use crate::auth::permissions::UserRole;
use crate::auth::types::{
    AuthContext, AuthSession, LoginRequest, RegisterRequest, UpdateProfileRequest, UserView,
};
use crate::cache::CacheInvalidator;
use crate::chapters::repository::ChapterRepository;
use crate::chapters::types::{CLASSES, SUBJECTS};
use crate::error::{DashboardError, Result};
use crate::{
    ldebug, linfo,
    logging::{LogComponent, LogStage},
};

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("static email pattern")
});

const NAME_MAX_LEN: usize = 50;
const PASSWORD_MIN_LEN: usize = 6;

fn invalid_credentials_error() -> DashboardError {
    DashboardError::auth("Invalid login credentials")
}

/// Authentication service
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    jwt: Arc<JwtManager>,
    invalidator: CacheInvalidator,
    bcrypt_cost: u32,
}

impl AuthService {
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        jwt: Arc<JwtManager>,
        invalidator: CacheInvalidator,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            db,
            jwt,
            invalidator,
            bcrypt_cost,
        }
    }

    /// 注册新用户并签发令牌
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthSession> {
        let valid = validate_registration(request)?;

        let existing = Users::find()
            .filter(users::Column::Email.eq(valid.email.as_str()))
            .one(self.db.as_ref())
            .await?;
        if existing.is_some() {
            return Err(duplicate_email_error());
        }

        let password_hash = hash(&valid.password, self.bcrypt_cost)?;
        let now = Utc::now().naive_utc();
        let user = users::ActiveModel {
            name: Set(valid.name),
            email: Set(valid.email),
            password_hash: Set(password_hash),
            role: Set(valid.role.as_str().to_string()),
            is_active: Set(true),
            profile: Set(valid.profile),
            last_login: Set(Some(now)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db.as_ref())
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_email_error(),
            _ => DashboardError::from(e),
        })?;

        let token = self.jwt.generate_token(user.id, &user.email, valid.role)?;

        linfo!(
            "system",
            LogStage::Authentication,
            LogComponent::Auth,
            "user_registered",
            &format!("用户注册成功: id={}, role={}", user.id, user.role)
        );

        Ok(AuthSession {
            user: UserView::from(&user),
            token,
        })
    }

    /// 邮箱密码登录，仅限激活用户
    pub async fn login(&self, request: LoginRequest) -> Result<AuthSession> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || request.password.is_empty() {
            return Err(DashboardError::validation(
                "Validation error",
                vec!["Email and password are required".to_string()],
            ));
        }

        let user = Users::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .filter(users::Column::IsActive.eq(true))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(invalid_credentials_error)?;

        if !verify(&request.password, &user.password_hash)? {
            return Err(invalid_credentials_error());
        }

        let role = UserRole::parse(&user.role).unwrap_or_default();
        let now = Utc::now().naive_utc();
        let mut active: users::ActiveModel = user.into();
        active.last_login = Set(Some(now));
        let user = active.update(self.db.as_ref()).await?;

        let token = self.jwt.generate_token(user.id, &user.email, role)?;

        linfo!(
            "system",
            LogStage::Authentication,
            LogComponent::Auth,
            "user_login",
            &format!("用户登录成功: id={}", user.id)
        );

        let mut view = UserView::from(&user);
        view.last_login = user.last_login;
        Ok(AuthSession { user: view, token })
    }

    /// 当前用户资料（含创建的章节数）
    pub async fn profile(&self, user_id: i32) -> Result<UserView> {
        let user = Users::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| DashboardError::not_found("User not found"))?;

        let chapters_count = ChapterRepository::new(Arc::clone(&self.db))
            .count_by_creator(user_id)
            .await?;

        let mut view = UserView::from(&user);
        view.is_active = Some(user.is_active);
        view.last_login = user.last_login;
        view.chapters_count = Some(chapters_count);
        view.created_at = Some(user.created_at);
        Ok(view)
    }

    /// 更新 `name` / `profile`，随后失效该用户的缓存
    pub async fn update_profile(
        &self,
        user_id: i32,
        request: UpdateProfileRequest,
    ) -> Result<UserView> {
        let mut errors = Vec::new();
        let name = request.name.map(|name| name.trim().to_string());
        if let Some(name) = &name {
            validate_name(name, &mut errors);
        }
        let profile = request
            .profile
            .map(|profile| normalize_profile(profile, &mut errors));
        if !errors.is_empty() {
            return Err(DashboardError::validation("Profile update failed", errors));
        }

        let user = Users::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| DashboardError::not_found("User not found"))?;

        let mut active: users::ActiveModel = user.into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(profile) = profile {
            active.profile = Set(Some(profile));
        }
        active.updated_at = Set(Utc::now().naive_utc());
        let user = active.update(self.db.as_ref()).await?;

        self.invalidator.invalidate_user(user_id).await;

        Ok(UserView::from(&user))
    }

    /// 解析 Bearer 令牌，并确认用户仍存在且处于激活状态
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext> {
        let claims = self.jwt.validate_token(token)?;
        let user_id = claims
            .user_id()
            .map_err(|e| DashboardError::auth_with_source("Invalid token", e))?;

        let user = Users::find_by_id(user_id)
            .one(self.db.as_ref())
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| DashboardError::auth("User not found or inactive"))?;

        ldebug!(
            "system",
            LogStage::Authentication,
            LogComponent::Auth,
            "token_verified",
            &format!("令牌验证通过: user_id={user_id}")
        );

        Ok(AuthContext {
            user_id: user.id,
            email: user.email,
            role: UserRole::parse(&user.role).unwrap_or_default(),
        })
    }
}

fn duplicate_email_error() -> DashboardError {
    DashboardError::bad_request("User with this email already exists")
}

/// 校验通过的注册数据
#[derive(Debug)]
struct ValidRegistration {
    name: String,
    email: String,
    password: String,
    role: UserRole,
    profile: Option<Value>,
}

fn validate_name(name: &str, errors: &mut Vec<String>) {
    if name.is_empty() {
        errors.push("Name is required".to_string());
    } else if name.chars().count() > NAME_MAX_LEN {
        errors.push(format!("Name cannot exceed {NAME_MAX_LEN} characters"));
    }
}

fn validate_registration(request: RegisterRequest) -> Result<ValidRegistration> {
    let mut errors = Vec::new();

    let name = request.name.trim().to_string();
    validate_name(&name, &mut errors);

    let email = request.email.trim().to_lowercase();
    if email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !EMAIL_RE.is_match(&email) {
        errors.push("Please provide a valid email".to_string());
    }

    if request.password.chars().count() < PASSWORD_MIN_LEN {
        errors.push(format!(
            "Password must be at least {PASSWORD_MIN_LEN} characters"
        ));
    }

    let role = match request.role.as_deref() {
        None => UserRole::default(),
        Some(raw) => raw.parse().unwrap_or_else(|e: String| {
            errors.push(e);
            UserRole::default()
        }),
    };

    let profile = request
        .profile
        .map(|profile| normalize_profile(profile, &mut errors));

    if errors.is_empty() {
        Ok(ValidRegistration {
            name,
            email,
            password: request.password,
            role,
            profile,
        })
    } else {
        Err(DashboardError::validation("Validation error", errors))
    }
}

/// 只保留 `class`、`subjects`、`school` 三个字段，未知字段被丢弃
fn normalize_profile(profile: Value, errors: &mut Vec<String>) -> Value {
    let Value::Object(input) = profile else {
        errors.push("Profile must be an object".to_string());
        return Value::Null;
    };

    let mut out = Map::new();
    if let Some(class) = input.get("class") {
        match class.as_str() {
            Some(c) if CLASSES.contains(&c) => {
                out.insert("class".into(), Value::String(c.to_string()));
            }
            _ => errors.push(format!("Profile class must be one of {}", CLASSES.join(", "))),
        }
    }
    if let Some(subjects) = input.get("subjects") {
        match subjects.as_array() {
            Some(items) if items.iter().all(|s| s.as_str().is_some_and(|s| SUBJECTS.contains(&s))) => {
                out.insert("subjects".into(), Value::Array(items.clone()));
            }
            _ => errors.push("Profile subjects contain an invalid subject".to_string()),
        }
    }
    if let Some(school) = input.get("school") {
        match school.as_str() {
            Some(s) => {
                out.insert("school".into(), Value::String(s.trim().to_string()));
            }
            None => errors.push("Profile school must be a string".to_string()),
        }
    }
    Value::Object(out)
}
