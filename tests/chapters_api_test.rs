//! 章节接口集成测试：读穿透缓存、写后失效、批量上传与错误响应

mod common;

use axum::http::{Method, StatusCode};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use pretty_assertions::assert_eq;
use serde_json::json;

use chapter_dashboard::cache::CACHE_STATUS_HEADER;
use common::{chapter, spawn_app, spawn_app_with};

#[tokio::test]
async fn list_is_cached_then_invalidated_by_create() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_chapter(&admin, chapter("Real Numbers", "10", 1, "Mathematics"))
        .await;

    let first = app.get("/api/v1/chapters?class=10", None).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header(CACHE_STATUS_HEADER), Some("MISS"));
    assert_eq!(first.body["data"]["chapters"].as_array().unwrap().len(), 1);
    assert!(first.body.get("cached").is_none());

    let expected_key = format!(
        "chapter_dashboard:/chapters:anonymous:{}",
        STANDARD.encode(r#"{"class":"10"}"#)
    );
    let stored = app.wait_for_key(&expected_key).await;
    assert_eq!(serde_json::from_str::<serde_json::Value>(&stored).unwrap(), first.body);

    let second = app.get("/api/v1/chapters?class=10", None).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.header(CACHE_STATUS_HEADER), Some("HIT"));
    assert_eq!(second.body["cached"], true);
    assert!(second.body["cacheTimestamp"].is_string());
    assert_eq!(second.body["data"], first.body["data"]);

    app.create_chapter(&admin, chapter("Polynomials", "10", 2, "Mathematics"))
        .await;
    assert!(app.keys("chapter_dashboard:*chapters*").await.is_empty());

    let third = app.get("/api/v1/chapters?class=10", None).await;
    assert_eq!(third.header(CACHE_STATUS_HEADER), Some("MISS"));
    let titles: Vec<&str> = third.body["data"]["chapters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Polynomials", "Real Numbers"]);
}

#[tokio::test]
async fn callers_and_queries_get_separate_entries() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let student = app.student_token().await;
    app.create_chapter(&admin, chapter("Motion", "9", 1, "Physics"))
        .await;

    app.get("/api/v1/chapters", None).await;
    app.get("/api/v1/chapters", Some(&student)).await;
    app.get("/api/v1/chapters?subject=Physics", None).await;

    app.wait_for_key(&format!(
        "chapter_dashboard:/chapters:anonymous:{}",
        STANDARD.encode("{}")
    ))
    .await;
    app.wait_for_key(&format!(
        "chapter_dashboard:/chapters:anonymous:{}",
        STANDARD.encode(r#"{"subject":"Physics"}"#)
    ))
    .await;

    let student_id = app.context.jwt.validate_token(&student).unwrap().sub;
    app.wait_for_key(&format!(
        "chapter_dashboard:/chapters:user:{student_id}:{}",
        STANDARD.encode("{}")
    ))
    .await;
    assert_eq!(app.keys("chapter_dashboard:*chapters*").await.len(), 3);
}

#[tokio::test]
async fn by_id_reads_are_keyed_per_resource() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let first = app
        .create_chapter(&admin, chapter("Motion", "9", 1, "Physics"))
        .await;
    let second = app
        .create_chapter(&admin, chapter("Atoms", "9", 2, "Chemistry"))
        .await;

    let a = app.get(&format!("/api/v1/chapters/{first}"), None).await;
    app.wait_for_key(&format!(
        "chapter_dashboard:/chapters/{first}:anonymous:{}",
        STANDARD.encode("{}")
    ))
    .await;
    let b = app.get(&format!("/api/v1/chapters/{second}"), None).await;

    assert_eq!(a.body["data"]["chapter"]["title"], "Motion");
    assert_eq!(b.body["data"]["chapter"]["title"], "Atoms");
    assert_eq!(b.header(CACHE_STATUS_HEADER), Some("MISS"));
    assert_eq!(a.body["data"]["chapter"]["createdBy"]["name"], "Admin");
}

#[tokio::test]
async fn update_and_delete_invalidate_reads() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let id = app
        .create_chapter(&admin, chapter("Motion", "9", 1, "Physics"))
        .await;
    let uri = format!("/api/v1/chapters/{id}");

    app.get(&uri, None).await;
    let key = format!(
        "chapter_dashboard:/chapters/{id}:anonymous:{}",
        STANDARD.encode("{}")
    );
    app.wait_for_key(&key).await;

    let mut payload = chapter("Motion and Rest", "9", 1, "Physics");
    payload["completionPercentage"] = json!(100);
    let updated = app.json(Method::PUT, &uri, Some(&admin), payload).await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["data"]["chapter"]["status"], "completed");
    assert!(app.keys("chapter_dashboard:*chapters*").await.is_empty());

    let fresh = app.get(&uri, None).await;
    assert_eq!(fresh.header(CACHE_STATUS_HEADER), Some("MISS"));
    assert_eq!(fresh.body["data"]["chapter"]["title"], "Motion and Rest");
    app.wait_for_key(&key).await;

    let deleted = app.delete(&uri, Some(&admin)).await;
    assert_eq!(deleted.status, StatusCode::OK);
    assert_eq!(deleted.body["message"], "Chapter deleted successfully");
    assert!(app.keys("chapter_dashboard:*chapters*").await.is_empty());

    let gone = app.get(&uri, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert_eq!(gone.body["message"], "Chapter not found");
}

#[tokio::test]
async fn error_responses_are_never_cached() {
    let app = spawn_app().await;

    let missing = app.get("/api/v1/chapters/999", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.body["status"], "error");

    let invalid = app.get("/api/v1/chapters/not-a-number", None).await;
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.body["message"], "Invalid chapter ID");

    let bad_query = app.get("/api/v1/chapters?limit=500", None).await;
    assert_eq!(bad_query.status, StatusCode::BAD_REQUEST);

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(app.store.is_empty());
}

#[tokio::test]
async fn unavailable_store_passes_through() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_chapter(&admin, chapter("Motion", "9", 1, "Physics"))
        .await;
    app.store.set_available(false);

    for _ in 0..2 {
        let response = app.get("/api/v1/chapters", None).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.header(CACHE_STATUS_HEADER), None);
        assert_eq!(response.body["data"]["chapters"].as_array().unwrap().len(), 1);
    }

    // 写操作在存储不可用时依然成功
    app.create_chapter(&admin, chapter("Atoms", "9", 2, "Chemistry"))
        .await;
}

#[tokio::test]
async fn disabled_cache_passes_through() {
    let app = spawn_app_with(|config| config.cache.enabled = false).await;
    let response = app.get("/api/v1/chapters", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header(CACHE_STATUS_HEADER), None);
}

#[tokio::test]
async fn list_filters_sorting_and_pagination() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.create_chapter(&admin, chapter("Algebra", "8", 3, "Mathematics"))
        .await;
    app.create_chapter(&admin, chapter("Light", "10", 10, "Physics"))
        .await;
    let mut weak = chapter("Carbon Compounds", "10", 4, "Chemistry");
    weak["weakChapters"] = json!(true);
    weak["description"] = json!("Covalent bonding and versatile nature of carbon");
    app.create_chapter(&admin, weak).await;

    let page = app
        .get("/api/v1/chapters?sort=title&limit=2&page=2", None)
        .await;
    assert_eq!(page.status, StatusCode::OK);
    let chapters = page.body["data"]["chapters"].as_array().unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0]["title"], "Light");
    let pagination = &page.body["data"]["pagination"];
    assert_eq!(pagination["currentPage"], 2);
    assert_eq!(pagination["totalPages"], 2);
    assert_eq!(pagination["totalChapters"], 3);
    assert_eq!(pagination["hasNextPage"], false);
    assert_eq!(pagination["hasPrevPage"], true);

    let weak_only = app
        .get("/api/v1/chapters?weakChapters=true&class=10", None)
        .await;
    let chapters = weak_only.body["data"]["chapters"].as_array().unwrap();
    assert_eq!(chapters.len(), 1);
    assert_eq!(chapters[0]["title"], "Carbon Compounds");
    assert_eq!(weak_only.body["data"]["filters"]["class"], "10");

    let search = app.get("/api/v1/chapters?search=covalent", None).await;
    assert_eq!(
        search.body["data"]["chapters"].as_array().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn writes_require_admin() {
    let app = spawn_app().await;
    let student = app.student_token().await;
    let body = chapter("Motion", "9", 1, "Physics");

    let anonymous = app
        .json(Method::POST, "/api/v1/chapters", None, body.clone())
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let forbidden = app
        .json(Method::POST, "/api/v1/chapters", Some(&student), body.clone())
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(
        forbidden.body["message"],
        "Access denied. Admin privileges required."
    );

    let bad_token = app
        .json(Method::POST, "/api/v1/chapters", Some("garbage"), body)
        .await;
    assert_eq!(bad_token.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad_token.body["message"], "Invalid token");

    let delete = app.delete("/api/v1/chapters/1", Some(&student)).await;
    assert_eq!(delete.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_reports_validation_errors() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .json(
            Method::POST,
            "/api/v1/chapters",
            Some(&admin),
            json!({"title": "Motion", "class": "5", "unit": 25}),
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Validation failed");
    let errors: Vec<&str> = response.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e.as_str().unwrap())
        .collect();
    assert!(errors.contains(&"Class must be between 6 and 12"));
    assert!(errors.contains(&"Unit cannot exceed 20"));
    assert!(errors.contains(&"Subject is required"));
}

#[tokio::test]
async fn upload_all_valid_returns_created() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.get("/api/v1/chapters", None).await;
    app.wait_for_key(&format!(
        "chapter_dashboard:/chapters:anonymous:{}",
        STANDARD.encode("{}")
    ))
    .await;

    let file = json!([
        chapter("Motion", "9", 1, "Physics"),
        chapter("Atoms", "9", 2, "Chemistry"),
    ])
    .to_string();
    let response = app
        .upload(&admin, "chapters.json", "application/json", &file)
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    assert_eq!(response.body["status"], "success");
    assert_eq!(
        response.body["message"],
        "Upload completed. 2 chapters added, 0 failed."
    );
    assert_eq!(response.body["data"]["summary"]["successful"], 2);
    assert!(app.keys("chapter_dashboard:*chapters*").await.is_empty());
}

#[tokio::test]
async fn upload_partial_failure_returns_multi_status() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let file = json!([
        chapter("Motion", "9", 1, "Physics"),
        {"title": "Broken", "class": "9", "unit": 1, "subject": "Astrology"},
    ])
    .to_string();
    let response = app
        .upload(&admin, "chapters.json", "application/json", &file)
        .await;

    assert_eq!(response.status, StatusCode::MULTI_STATUS);
    assert_eq!(response.body["status"], "partial_success");
    let failed = response.body["data"]["failed"].as_array().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0]["index"], 1);
    assert_eq!(failed[0]["error"], "Invalid subject");
}

#[tokio::test]
async fn upload_rejects_bad_files() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let not_json = app
        .upload(&admin, "chapters.txt", "text/plain", "hello")
        .await;
    assert_eq!(not_json.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_json.body["message"], "Only JSON files are allowed");

    let malformed = app
        .upload(&admin, "chapters.json", "application/json", "{not json")
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);
    assert_eq!(malformed.body["message"], "Invalid JSON file format");

    let object = app
        .upload(&admin, "chapters.json", "application/json", r#"{"title":"x"}"#)
        .await;
    assert_eq!(object.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        object.body["message"],
        "JSON file must contain an array of chapters"
    );

    let student = app.student_token().await;
    let forbidden = app
        .upload(&student, "chapters.json", "application/json", "[]")
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn upload_enforces_file_size_limit() {
    let app = spawn_app_with(|config| config.upload.max_file_size = 1024 * 1024).await;
    let admin = app.admin_token().await;

    let big = format!("[\"{}\"]", "x".repeat(1024 * 1024));
    let response = app
        .upload(&admin, "chapters.json", "application/json", &big)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "File too large. Maximum size is 1MB."
    );
}

#[tokio::test]
async fn unknown_routes_return_json_404() {
    let app = spawn_app().await;
    let response = app.get("/api/v1/nothing-here", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Route /api/v1/nothing-here not found");
    assert!(response.body["availableRoutes"]["chapters"].is_object());
}

#[tokio::test]
async fn health_and_index() {
    let app = spawn_app().await;

    let health = app.get("/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["message"], "Server is running");
    assert_eq!(health.body["cache"]["backend"], "memory");
    assert_eq!(health.body["cache"]["available"], true);
    assert!(health.header("x-request-id").is_some());

    let index = app.get("/api/v1", None).await;
    assert_eq!(index.status, StatusCode::OK);
    assert_eq!(index.body["endpoints"]["chapters"]["list"], "GET /api/v1/chapters");
}
