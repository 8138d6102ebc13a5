//! # 错误处理测试

use crate::error::{CacheError, DashboardError};
use axum::http::StatusCode;
use std::error::Error;

#[test]
fn test_config_error_creation() {
    let err = DashboardError::config("测试配置错误");
    assert!(matches!(err, DashboardError::Config { .. }));
    assert_eq!(err.to_string(), "配置错误: 测试配置错误");
}

#[test]
fn test_config_error_with_source() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err = DashboardError::config_with_source("配置文件加载失败", io_err);

    assert!(err.to_string().contains("配置错误: 配置文件加载失败"));
    assert!(err.source().is_some());
}

#[test]
fn test_auto_conversion_from_io_error() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "文件不存在");
    let err: DashboardError = io_err.into();

    assert!(matches!(err, DashboardError::Io { .. }));
    assert!(err.to_string().contains("IO错误: 文件操作失败"));
}

#[test]
fn test_auto_conversion_from_toml_error() {
    let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
    let err: DashboardError = toml_err.into();

    assert!(matches!(err, DashboardError::Config { .. }));
    assert!(err.to_string().contains("配置错误: TOML解析失败"));
}

#[test]
fn test_status_mapping() {
    assert_eq!(
        DashboardError::not_found("Chapter not found")
            .to_http_response_parts()
            .0,
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        DashboardError::permission("forbidden")
            .to_http_response_parts()
            .0,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        DashboardError::rate_limit("slow down", 60)
            .to_http_response_parts()
            .1,
        "RATE_LIMIT_EXCEEDED"
    );
    assert_eq!(
        DashboardError::from(CacheError::Unavailable)
            .to_http_response_parts()
            .0,
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_client_message_hides_internals() {
    let err = DashboardError::database("connection pool exhausted");
    assert_eq!(err.client_message(), "Internal server error");
    assert!(!err.is_client_error());

    let err = DashboardError::bad_request("Invalid chapter ID");
    assert_eq!(err.client_message(), "Invalid chapter ID");
    assert!(err.is_client_error());
}

#[test]
fn test_error_macros() {
    let err = crate::dashboard_err!(auth, "Token validation failed: {}", "bad signature");
    assert_eq!(err.client_message(), "Token validation failed: bad signature");

    let err = crate::config_error!("port {} is reserved", 0);
    assert_eq!(err.to_string(), "配置错误: port 0 is reserved");
}

#[test]
fn test_cache_connection_errors() {
    assert!(CacheError::Unavailable.is_connection_error());
    assert!(CacheError::timeout("GET", 500).is_connection_error());
    assert!(!CacheError::InvalidPattern("[".into()).is_connection_error());
}
