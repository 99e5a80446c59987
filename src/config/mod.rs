// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Configuration management for Keepsake

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// External recognition/summarization services
    #[serde(default)]
    pub services: ServicesConfig,

    /// Persistent media storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Album store settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServicesConfig {
    /// Face detection service base URL
    #[serde(default = "default_face_url")]
    pub face_url: String,

    /// Speaker identification service base URL
    #[serde(default = "default_voice_url")]
    pub voice_url: String,

    /// Audio extraction (video transcode) service base URL
    #[serde(default = "default_extractor_url")]
    pub extractor_url: String,

    /// Summarizer engine settings
    #[serde(default)]
    pub summarizer: SummarizerConfig,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SummarizerConfig {
    /// Ollama base URL
    #[serde(default = "default_summarizer_url")]
    pub url: String,

    /// Text model used for album summaries
    #[serde(default = "default_summarizer_model")]
    pub model: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StorageConfig {
    /// Prefix for persistent locators (`{prefix}/{kind}/{hash}_{name}`)
    #[serde(default = "default_storage_prefix")]
    pub prefix: String,

    /// Cover art used until a real cover is available
    #[serde(default = "default_placeholder_cover")]
    pub placeholder_cover: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

// Default value functions
fn default_face_url() -> String { "http://localhost:7001".to_string() }
fn default_voice_url() -> String { "http://localhost:7002".to_string() }
fn default_extractor_url() -> String { "http://localhost:7003".to_string() }
fn default_summarizer_url() -> String { "http://localhost:11434".to_string() }
fn default_summarizer_model() -> String { "llama3.2:3b".to_string() }
fn default_timeout() -> u64 { 120 }
fn default_storage_prefix() -> String { "persistent".to_string() }
fn default_placeholder_cover() -> String { crate::model::PLACEHOLDER_COVER.to_string() }
fn default_db_path() -> String { "keepsake.db".to_string() }

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            face_url: default_face_url(),
            voice_url: default_voice_url(),
            extractor_url: default_extractor_url(),
            summarizer: SummarizerConfig::default(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            url: default_summarizer_url(),
            model: default_summarizer_model(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            prefix: default_storage_prefix(),
            placeholder_cover: default_placeholder_cover(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            services: ServicesConfig::default(),
            storage: StorageConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = serde_json::from_str(&content)
                .map_err(|e| crate::KeepsakeError::Config(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
