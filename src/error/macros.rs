//! # 错误处理宏

/// 按变体构造错误：`dashboard_err!(auth, "Token validation failed: {}", e)`
#[macro_export]
macro_rules! dashboard_err {
    ($kind:ident, $msg:expr) => {
        $crate::error::DashboardError::$kind($msg)
    };
    ($kind:ident, $fmt:expr, $($arg:tt)*) => {
        $crate::error::DashboardError::$kind(format!($fmt, $($arg)*))
    };
}

/// 快速创建配置错误的宏
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::error::DashboardError::config($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::DashboardError::config(format!($fmt, $($arg)*))
    };
}

/// 确保条件成立，否则返回配置错误
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::config_error!($msg));
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !($cond) {
            return Err($crate::config_error!($fmt, $($arg)*));
        }
    };
}
