//! # 路由配置
//!
//! 定义所有API路由和路由组织。中间件顺序（由外到内）：
//! 限流 → 认证/角色检查 → 读穿透缓存 → 处理器。

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{MethodRouter, get, post, put},
};

use super::handlers::{auth, chapters, system};
use super::middleware::{require_admin, require_auth};
use super::server::AppState;
use crate::cache::read_through;
use crate::rate_limit::{RateLimitRule, enforce};

/// multipart 边界等额外开销
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// 创建 API 前缀下的所有路由
pub fn create_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(system::api_index))
        .nest("/auth", auth_routes(state))
        .nest("/chapters", chapter_routes(state))
}

/// 认证路由
fn auth_routes(state: &AppState) -> Router<AppState> {
    let profile_cache = state
        .response_cache
        .with_ttl(state.config.cache.profile_ttl);

    let router = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route(
            "/profile",
            get(auth::profile)
                .layer(from_fn_with_state(profile_cache, read_through))
                .put(auth::update_profile)
                .layer(from_fn(require_auth)),
        )
        .route("/logout", post(auth::logout).layer(from_fn(require_auth)));

    limited(router, state.config.rate_limit.enabled.then(|| {
        RateLimitRule::auth(state.rate_limiter.clone(), state.config.rate_limit.auth)
    }))
}

/// 章节路由
fn chapter_routes(state: &AppState) -> Router<AppState> {
    let cached = from_fn_with_state(state.response_cache.clone(), read_through);
    let admin = from_fn(require_admin);

    let router = Router::new()
        .route("/", get(chapters::list_chapters).layer(cached.clone()))
        .route("/", post(chapters::create_chapter).layer(admin.clone()))
        .route("/upload", upload_route(state))
        .route("/{id}", get(chapters::get_chapter).layer(cached))
        .route(
            "/{id}",
            put(chapters::update_chapter)
                .delete(chapters::delete_chapter)
                .layer(admin),
        );

    limited(router, state.config.rate_limit.enabled.then(|| {
        RateLimitRule::api(state.rate_limiter.clone(), state.config.rate_limit.api)
    }))
}

/// 上传路由：管理员 → 上传限流 → 请求体上限 → 处理器
fn upload_route(state: &AppState) -> MethodRouter<AppState> {
    let body_limit = state.config.upload.max_file_size + MULTIPART_OVERHEAD;
    let mut route = post(chapters::upload_chapters).layer(DefaultBodyLimit::max(body_limit));

    if state.config.rate_limit.enabled {
        let rule =
            RateLimitRule::upload(state.rate_limiter.clone(), state.config.rate_limit.upload);
        route = route.layer(from_fn_with_state(rule, enforce));
    }
    route.layer(from_fn(require_admin))
}

fn limited(router: Router<AppState>, rule: Option<RateLimitRule>) -> Router<AppState> {
    match rule {
        Some(rule) => router.layer(from_fn_with_state(rule, enforce)),
        None => router,
    }
}
