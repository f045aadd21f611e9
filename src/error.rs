//! Error handling module
//!
//! Provides the unified error type for the whole generator. Every variant is
//! fatal: the run stops at the first error and nothing is retried.

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Catalog error: {0}")]
    Catalog(#[from] sqlx::Error),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Render error: {0}")]
    Render(#[from] std::fmt::Error),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Short machine-readable code, used as a structured log field
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) | AppError::Validation(_) => "CONFIG_ERROR",
            AppError::Catalog(_) => "CATALOG_ERROR",
            AppError::Io(_) => "OUTPUT_ERROR",
            AppError::Render(_) => "RENDER_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
        }
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

/// Helper function to create a configuration error
pub fn config_error(msg: impl Into<String>) -> AppError {
    AppError::Config(msg.into())
}

/// Helper function to create a not found error
pub fn not_found_error(msg: impl Into<String>) -> AppError {
    AppError::NotFound(msg.into())
}
