//! Error handling module
//!
//! Centralized error type wrapping the per-layer errors.

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),
}
