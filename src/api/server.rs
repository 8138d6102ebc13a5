//! # HTTP 服务器
//!
//! 组装 axum 路由与全局中间件，负责监听与优雅关闭。

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use std::net::SocketAddr;
use std::ops::Deref;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::handlers::system;
use super::middleware::{REQUEST_ID_HEADER, identify, request_id_middleware};
use super::routes::create_routes;
use crate::app::AppContext;
use crate::config::ServerConfig;
use crate::error::{DashboardError, Result};
use crate::{
    linfo, lwarn,
    logging::{LogComponent, LogStage},
};

/// 应用状态（处理器与中间件的 `State`）
#[derive(Clone)]
pub struct AppState {
    context: Arc<AppContext>,
}

impl AppState {
    #[must_use]
    pub const fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    #[must_use]
    pub const fn context_arc(&self) -> &Arc<AppContext> {
        &self.context
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// 创建完整的应用路由器
pub fn create_router(context: Arc<AppContext>) -> Router {
    let state = AppState::new(context);
    let config = Arc::clone(&state.config);

    let api_routes = create_routes(&state);

    Router::new()
        .route("/health", get(system::health))
        .nest(&config.server.api_prefix, api_routes)
        .nest_service("/uploads", ServeDir::new(&config.upload.dir))
        .fallback(system::not_found)
        .layer(from_fn_with_state(state.clone(), identify))
        .layer(DefaultBodyLimit::max(config.server.body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.server)),
        )
        .with_state(state)
}

/// CORS 配置：`*` 表示任意来源，否则为来源白名单
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    if config.cors_origins.iter().any(|origin| origin == "*") {
        return cors.allow_origin(Any);
    }

    let origins = config
        .cors_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<std::result::Result<Vec<_>, _>>();

    match origins {
        Ok(origins) => cors.allow_origin(origins),
        Err(e) => {
            lwarn!(
                "system",
                LogStage::Startup,
                LogComponent::ServerSetup,
                "cors_config_fail",
                &format!("Invalid CORS origin configuration: {e}, falling back to allow any")
            );
            cors.allow_origin(Any)
        }
    }
}

/// 启动服务器，收到 Ctrl-C / SIGTERM 后优雅关闭
pub async fn serve(context: Arc<AppContext>) -> Result<()> {
    let bind_address = context.config.server.bind_address();
    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        DashboardError::config_with_source(format!("无效的监听地址: {bind_address}"), e)
    })?;

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        DashboardError::server_start_with_source(format!("无法绑定端口: {addr}"), e)
    })?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::ServerSetup,
        "server_start",
        &format!(
            "🚀 服务器启动: http://{addr}{} (env={})",
            context.config.server.api_prefix, context.config.server.environment
        )
    );

    let app = create_router(context);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| DashboardError::server_start_with_source("服务器运行错误", e))?;

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::ServerSetup,
        "server_stopped",
        "服务器已关闭"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            lwarn!(
                "system",
                LogStage::Shutdown,
                LogComponent::ServerSetup,
                "signal_handler_failed",
                &format!("无法监听 Ctrl-C: {e}")
            );
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                lwarn!(
                    "system",
                    LogStage::Shutdown,
                    LogComponent::ServerSetup,
                    "signal_handler_failed",
                    &format!("无法监听 SIGTERM: {e}")
                );
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::ServerSetup,
        "shutdown_signal",
        "收到关闭信号，开始优雅关闭"
    );
}
