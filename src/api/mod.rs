//! # HTTP API
//!
//! axum 路由、处理器、中间件与统一响应格式

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod server;

pub use server::{AppState, create_router, serve};
