// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Ollama API client used for album summary generation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::Summarizer;
use crate::{KeepsakeError, Result};

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(KeepsakeError::Api)?;

        // Normalize URL
        let base_url = base_url
            .trim_end_matches('/')
            .replace("/api/generate", "");

        Ok(Self { client, base_url })
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/api/tags", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                KeepsakeError::ServiceUnavailable(format!(
                    "Cannot connect to Ollama at {}: {}",
                    self.base_url, e
                ))
            })?;

        Ok(())
    }

    /// Generate text completion
    pub async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model: model.to_string(),
            prompt: prompt.to_string(),
            stream: false,
        };

        debug!("Sending request to Ollama: model={}", model);

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(KeepsakeError::ServiceUnavailable(format!(
                "Ollama returned status {}",
                response.status()
            )));
        }

        let result: GenerateResponse = response.json().await?;
        Ok(result.response)
    }
}

/// [`Summarizer`] backed by an Ollama text model.
///
/// No retries here: a summary failure is absorbed into the album's summary
/// field as a marker string, so fast failure is preferable to backoff.
pub struct OllamaSummarizer {
    client: OllamaClient,
    model: String,
}

impl OllamaSummarizer {
    pub fn new(base_url: &str, model: &str) -> Result<Self> {
        Ok(Self {
            client: OllamaClient::new(base_url)?,
            model: model.to_string(),
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        self.client.health_check().await
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, description: &str) -> Result<String> {
        let prompt = format!(
            "Summarize the content of the following album description in a concise manner:\n\n{}",
            description
        );
        let summary = self.client.generate(&self.model, &prompt).await?;
        Ok(summary.trim().to_string())
    }
}
