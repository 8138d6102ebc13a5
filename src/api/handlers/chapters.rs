//! # 章节处理器
//!
//! 读取接口对所有调用方开放，写入接口需要管理员角色（由路由层保证）。

use axum::{
    Json,
    extract::{
        Multipart, Path, RawQuery, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::api::extract::JsonBody;
use crate::api::middleware::CurrentUser;
use crate::api::response::{self, SuccessResponse};
use crate::api::server::AppState;
use crate::cache::QueryParams;
use crate::chapters::ChapterQuery;
use crate::error::{DashboardError, Result};

/// 上传表单中的文件字段名
pub const UPLOAD_FIELD: &str = "file";

/// 过滤 + 分页列表
pub async fn list_chapters(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> Result<Response> {
    let params = QueryParams::parse(raw.as_deref());
    let query = ChapterQuery::from_params(&params)?;
    let list = state.chapter_service.list(query).await?;
    Ok(response::success(list))
}

/// 单个章节
pub async fn get_chapter(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let chapter = state.chapter_service.get(&id).await?;
    Ok(response::success(json!({ "chapter": chapter })))
}

/// 创建单个章节
pub async fn create_chapter(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonBody(payload): JsonBody<Value>,
) -> Result<Response> {
    let chapter = state.chapter_service.create(&payload, &user).await?;
    Ok(response::success_with_message(
        StatusCode::CREATED,
        json!({ "chapter": chapter }),
        "Chapter created successfully",
    ))
}

/// 以 JSON 文件批量导入
///
/// 全部成功返回 201，部分失败返回 207 并附带失败明细。
pub async fn upload_chapters(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut multipart = multipart.map_err(|_| DashboardError::bad_request("No file uploaded"))?;
    let max_size = state.config.upload.max_file_size;

    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| upload_error(&e, max_size))? {
        if field.name() == Some(UPLOAD_FIELD) {
            ensure_json_file(&field)?;
            let bytes = field.bytes().await.map_err(|e| upload_error(&e, max_size))?;
            file = Some(bytes);
            break;
        }
    }

    let file = file.ok_or_else(|| DashboardError::bad_request("No file uploaded"))?;
    if file.len() > max_size {
        return Err(file_too_large(max_size));
    }

    let report = state.chapter_service.upload(&file, &user).await?;
    let (status_code, status) = if report.is_complete() {
        (StatusCode::CREATED, "success")
    } else {
        (StatusCode::MULTI_STATUS, "partial_success")
    };
    let message = report.message();

    Ok((
        status_code,
        Json(SuccessResponse {
            status,
            message: Some(message),
            data: Some(report),
        }),
    )
        .into_response())
}

/// 整体更新章节
pub async fn update_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<Value>,
) -> Result<Response> {
    let chapter = state.chapter_service.update(&id, &payload).await?;
    Ok(response::success_with_message(
        StatusCode::OK,
        json!({ "chapter": chapter }),
        "Chapter updated successfully",
    ))
}

/// 删除章节
pub async fn delete_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    state.chapter_service.delete(&id).await?;
    Ok(response::success_without_data("Chapter deleted successfully"))
}

/// 只接受 JSON 文件：`application/json`，或未声明类型但扩展名为 `.json`
fn ensure_json_file(field: &Field<'_>) -> Result<()> {
    let by_type = field
        .content_type()
        .is_some_and(|ct| ct.starts_with("application/json"));
    let by_name = field.content_type().is_none()
        && field
            .file_name()
            .is_some_and(|name| name.to_ascii_lowercase().ends_with(".json"));
    if by_type || by_name {
        Ok(())
    } else {
        Err(DashboardError::bad_request("Only JSON files are allowed"))
    }
}

fn file_too_large(max_size: usize) -> DashboardError {
    DashboardError::bad_request(format!(
        "File too large. Maximum size is {}MB.",
        max_size / (1024 * 1024)
    ))
}

fn upload_error(error: &MultipartError, max_size: usize) -> DashboardError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        file_too_large(max_size)
    } else {
        DashboardError::bad_request(format!("File upload error: {}", error.body_text()))
    }
}
