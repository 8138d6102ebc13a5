//! The unified error handling system for the application.

pub use cache::CacheError;
pub use types::DashboardError;

/// A unified `Result` type for the entire application.
///
/// All functions that can fail should return this type.
pub type Result<T> = std::result::Result<T, DashboardError>;

pub mod cache;
pub mod macros;
pub mod types;

#[cfg(test)]
mod tests;
