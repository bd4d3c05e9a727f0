pub mod health;
pub mod webhook;

use crate::error::AppError;

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found() -> AppError {
    AppError::not_found("Not found")
}
