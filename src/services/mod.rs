// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Collaborator seams for external recognition, summarization, and storage
//!
//! Each trait is a pure request/response contract; the pipeline never assumes
//! anything about the implementation behind it. HTTP-backed clients live in
//! [`recognition`] and [`ollama`]; deterministic in-process versions for
//! offline mode and tests live in [`mock`].

pub mod mock;
pub mod ollama;
pub mod recognition;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{Album, BoundingBox, MediaAsset};
use crate::{KeepsakeError, Result};

/// A face found by the detection service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub bounding_box: BoundingBox,
    pub confidence: f64,
}

/// A speaker profile returned by the identification service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Face detection over an image or video asset
#[async_trait]
pub trait FaceDetector: Send + Sync {
    /// May return an empty list. A failure is non-fatal to the asset: the
    /// orchestrator records it and keeps the asset in the batch.
    async fn detect_faces(&self, asset: &MediaAsset, payload: &[u8]) -> Result<Vec<FaceDetection>>;
}

/// Speaker identification over an audio locator
#[async_trait]
pub trait VoiceIdentifier: Send + Sync {
    /// `Ok(None)` means no distinct speaker, which is a valid outcome.
    async fn identify_speaker(&self, audio_locator: &str) -> Result<Option<VoiceProfile>>;
}

/// Audio track extraction from a video asset (opaque transcode)
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Returns the locator of the extracted audio. Failure degrades voice
    /// analysis for that asset only.
    async fn extract_audio(&self, asset: &MediaAsset, payload: &[u8]) -> Result<String>;
}

/// Album description summarization
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, description: &str) -> Result<String>;
}

/// Chat transcript content extraction
#[async_trait]
pub trait ChatReader: Send + Sync {
    async fn read_chat(&self, file_name: &str, payload: &[u8]) -> Result<String>;
}

/// Fetch/save of the album collection (external persistent store).
/// Bulk snapshot semantics: a save either persists the whole collection or
/// nothing.
#[async_trait]
pub trait AlbumStore: Send + Sync {
    async fn fetch_albums(&self) -> Result<Vec<Album>>;
    async fn save_albums(&self, albums: &[Album]) -> Result<()>;
}

/// Default transcript reader: uploads are plain UTF-8 text exports
pub struct Utf8ChatReader;

#[async_trait]
impl ChatReader for Utf8ChatReader {
    async fn read_chat(&self, file_name: &str, payload: &[u8]) -> Result<String> {
        std::str::from_utf8(payload)
            .map(str::to_owned)
            .map_err(|e| KeepsakeError::Analysis(format!("chat {} is not UTF-8: {}", file_name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_utf8_chat_reader() {
        let reader = Utf8ChatReader;
        let text = reader.read_chat("chat.txt", b"hello\nthere").await.unwrap();
        assert_eq!(text, "hello\nthere");

        let err = reader.read_chat("bad.txt", &[0xff, 0xfe, 0x00]).await;
        assert!(err.is_err());
    }
}
