//! # API 中间件

pub mod auth;
pub mod request_id;

pub use auth::{CurrentUser, identify, require_admin, require_auth};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
