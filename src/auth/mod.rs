//! # 认证模块
//!
//! JWT 令牌、用户角色与账户服务

pub mod jwt;
pub mod permissions;
pub mod service;
pub mod types;

pub use jwt::JwtManager;
pub use permissions::UserRole;
pub use service::AuthService;
pub use types::{
    AuthContext, AuthSession, JwtClaims, LoginRequest, RegisterRequest, UpdateProfileRequest,
    UserView, bearer_token,
};
