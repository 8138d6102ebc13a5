//! 集成测试公共工具：内存 SQLite + `MemoryStore` 装配完整路由器

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use chapter_dashboard::{
    AppConfig,
    api::create_router,
    app::AppContext,
    cache::{CacheStore, MemoryStore},
    config::CacheBackend,
    database,
};

pub const BOUNDARY: &str = "dashboard-test-boundary";

/// 测试应用
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub context: Arc<AppContext>,
}

/// 测试响应
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.server.environment = "test".to_string();
    config.database.url = "sqlite::memory:".to_string();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.auth.bcrypt_cost = 4;
    config.cache.backend = CacheBackend::Memory;
    config.rate_limit.enabled = false;
    config.seed.enabled = false;
    config
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut AppConfig)) -> TestApp {
    let mut config = test_config();
    customize(&mut config);

    let db = database::init_database(&config.database)
        .await
        .expect("connect test db");
    database::run_migrations(&db).await.expect("run migrations");

    let store = Arc::new(MemoryStore::new());
    let context = Arc::new(AppContext::new(
        Arc::new(config),
        Arc::new(db),
        store.clone(),
    ));

    TestApp {
        router: create_router(Arc::clone(&context)),
        store,
        context,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(build_request(Method::GET, uri, token, None)).await
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> TestResponse {
        self.send(build_request(method, uri, token, Some(body))).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.send(build_request(Method::DELETE, uri, token, None))
            .await
    }

    /// 注册用户并返回令牌
    pub async fn register(&self, name: &str, email: &str, role: &str) -> String {
        let response = self
            .json(
                Method::POST,
                "/api/v1/auth/register",
                None,
                json!({
                    "name": name,
                    "email": email,
                    "password": "password123",
                    "role": role,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["data"]["token"]
            .as_str()
            .expect("token in register response")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.register("Admin", "admin@example.com", "admin").await
    }

    pub async fn student_token(&self) -> String {
        self.register("Student", "student@example.com", "student").await
    }

    /// 以管理员身份创建章节，返回 ID
    pub async fn create_chapter(&self, token: &str, body: Value) -> i64 {
        let response = self
            .json(Method::POST, "/api/v1/chapters", Some(token), body)
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["data"]["chapter"]["id"]
            .as_i64()
            .expect("chapter id")
    }

    /// 上传 JSON 文件
    pub async fn upload(&self, token: &str, file_name: &str, content_type: &str, contents: &str) -> TestResponse {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n\
             {contents}\r\n\
             --{BOUNDARY}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/chapters/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("build upload request");
        self.send(request).await
    }

    /// 等待后台缓存写入完成
    pub async fn wait_for_key(&self, key: &str) -> String {
        for _ in 0..100 {
            if let Ok(Some(value)) = self.store.get(key).await {
                return value;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("cache key never written: {key}");
    }

    /// 当前存储中匹配模式的键
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        let mut keys = self.store.keys(pattern).await.expect("list keys");
        keys.sort();
        keys
    }
}

pub fn build_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).expect("build request")
}

/// 合法的章节载荷
pub fn chapter(title: &str, class: &str, unit: u32, subject: &str) -> Value {
    json!({
        "title": title,
        "class": class,
        "unit": unit,
        "subject": subject,
    })
}
