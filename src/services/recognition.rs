// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! HTTP clients for the face detection, speaker identification, and audio
//! extraction services

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{AudioExtractor, FaceDetector, FaceDetection, VoiceIdentifier, VoiceProfile};
use crate::model::MediaAsset;
use crate::{KeepsakeError, Result};

fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(KeepsakeError::Api)
}

fn normalize_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Client for the face detection service
pub struct FaceApiClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    file_name: &'a str,
    kind: &'a str,
    /// Base64-encoded media payload
    data: String,
}

#[derive(Deserialize)]
struct DetectResponse {
    faces: Vec<FaceDetection>,
}

impl FaceApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: normalize_url(base_url),
        })
    }

    /// Check if the service is reachable
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                KeepsakeError::ServiceUnavailable(format!(
                    "Cannot connect to face service at {}: {}",
                    self.base_url, e
                ))
            })?;
        Ok(())
    }
}

#[async_trait]
impl FaceDetector for FaceApiClient {
    async fn detect_faces(&self, asset: &MediaAsset, payload: &[u8]) -> Result<Vec<FaceDetection>> {
        let url = format!("{}/detect", self.base_url);
        debug!("Face detection request for {} ({} bytes)", asset.label, payload.len());

        let request = DetectRequest {
            file_name: &asset.label,
            kind: asset.kind.as_str(),
            data: general_purpose::STANDARD.encode(payload),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(KeepsakeError::ServiceUnavailable(format!(
                "Face service returned status {}",
                response.status()
            )));
        }

        let result: DetectResponse = response.json().await?;
        Ok(result.faces)
    }
}

/// Client for the speaker identification service
pub struct VoiceApiClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct IdentifyRequest<'a> {
    audio_locator: &'a str,
}

#[derive(Deserialize)]
struct IdentifyResponse {
    /// Absent when no distinct speaker was found
    profile: Option<VoiceProfile>,
}

impl VoiceApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: normalize_url(base_url),
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                KeepsakeError::ServiceUnavailable(format!(
                    "Cannot connect to voice service at {}: {}",
                    self.base_url, e
                ))
            })?;
        Ok(())
    }
}

#[async_trait]
impl VoiceIdentifier for VoiceApiClient {
    async fn identify_speaker(&self, audio_locator: &str) -> Result<Option<VoiceProfile>> {
        let url = format!("{}/identify", self.base_url);
        debug!("Speaker identification request for {}", audio_locator);

        let request = IdentifyRequest { audio_locator };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(KeepsakeError::ServiceUnavailable(format!(
                "Voice service returned status {}",
                response.status()
            )));
        }

        let result: IdentifyResponse = response.json().await?;
        Ok(result.profile)
    }
}

/// Client for the audio extraction (video transcode) service
pub struct ExtractorApiClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    file_name: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct ExtractResponse {
    audio_locator: String,
}

impl ExtractorApiClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: normalize_url(base_url),
        })
    }

    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        self.client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| {
                KeepsakeError::ServiceUnavailable(format!(
                    "Cannot connect to extractor service at {}: {}",
                    self.base_url, e
                ))
            })?;
        Ok(())
    }
}

#[async_trait]
impl AudioExtractor for ExtractorApiClient {
    async fn extract_audio(&self, asset: &MediaAsset, payload: &[u8]) -> Result<String> {
        let url = format!("{}/extract", self.base_url);
        debug!("Audio extraction request for {} ({} bytes)", asset.label, payload.len());

        let request = ExtractRequest {
            file_name: &asset.label,
            data: general_purpose::STANDARD.encode(payload),
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(KeepsakeError::ServiceUnavailable(format!(
                "Extractor service returned status {}",
                response.status()
            )));
        }

        let result: ExtractResponse = response.json().await?;
        Ok(result.audio_locator)
    }
}
