// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Error types for Keepsake

use thiserror::Error;

/// Result type alias for Keepsake operations
pub type Result<T> = std::result::Result<T, KeepsakeError>;

/// Keepsake error types
#[derive(Error, Debug)]
pub enum KeepsakeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system error: {0}")]
    FileSystem(#[from] std::io::Error),

    #[error("API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("Transfer boundary violation: {0}")]
    Boundary(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
