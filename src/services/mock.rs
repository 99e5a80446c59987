// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Deterministic in-process collaborators for offline mode and tests
//!
//! These stand in for the real recognition services. Outcomes are derived
//! from content hashes rather than randomness, so a given upload always
//! produces the same detections.

use async_trait::async_trait;

use super::{
    AlbumStore, AudioExtractor, FaceDetection, FaceDetector, Summarizer, VoiceIdentifier,
    VoiceProfile,
};
use crate::classify::sanitize_file_name;
use crate::model::{Album, BoundingBox, MediaAsset};
use crate::{KeepsakeError, Result};

/// Speaker roster the mock identifier draws from
const SPEAKERS: [(&str, &str); 4] = [
    ("v_alex", "Alex J"),
    ("v_maria", "Maria G"),
    ("v_chen", "Chen W"),
    ("v_samira", "Samira K"),
];

fn label_hash(label: &str) -> u8 {
    blake3::hash(label.as_bytes()).as_bytes()[0]
}

/// Face detector returning 0–3 deterministic faces per asset
pub struct MockFaceDetector {
    fixed_count: Option<usize>,
}

impl MockFaceDetector {
    pub fn new() -> Self {
        Self { fixed_count: None }
    }

    /// Always report exactly `count` faces, regardless of input
    pub fn with_fixed_count(count: usize) -> Self {
        Self { fixed_count: Some(count) }
    }
}

impl Default for MockFaceDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FaceDetector for MockFaceDetector {
    async fn detect_faces(&self, asset: &MediaAsset, _payload: &[u8]) -> Result<Vec<FaceDetection>> {
        let count = self
            .fixed_count
            .unwrap_or_else(|| (label_hash(&asset.label) % 4) as usize);

        let faces = (0..count)
            .map(|i| {
                let offset = (i as u32) * 60;
                FaceDetection {
                    bounding_box: BoundingBox {
                        x: 10 + offset,
                        y: 20,
                        width: 50,
                        height: 55,
                    },
                    confidence: 0.80 + (i as f64) * 0.05,
                }
            })
            .collect();
        Ok(faces)
    }
}

/// Speaker identifier drawing from a fixed roster; roughly one in five
/// inputs yields "no distinct speaker"
pub struct MockVoiceIdentifier {
    fixed_profile: Option<Option<VoiceProfile>>,
}

impl MockVoiceIdentifier {
    pub fn new() -> Self {
        Self { fixed_profile: None }
    }

    /// Always return this identification outcome
    pub fn with_profile(profile: Option<VoiceProfile>) -> Self {
        Self { fixed_profile: Some(profile) }
    }
}

impl Default for MockVoiceIdentifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VoiceIdentifier for MockVoiceIdentifier {
    async fn identify_speaker(&self, audio_locator: &str) -> Result<Option<VoiceProfile>> {
        if let Some(fixed) = &self.fixed_profile {
            return Ok(fixed.clone());
        }

        let pick = (label_hash(audio_locator) % 5) as usize;
        if pick >= SPEAKERS.len() {
            return Ok(None);
        }
        let (id, name) = SPEAKERS[pick];
        Ok(Some(VoiceProfile {
            id: id.to_string(),
            name: name.to_string(),
            confidence: Some(0.85),
        }))
    }
}

/// Audio extractor deriving a stable extracted-track locator from the video
/// filename, mirroring where a real transcoder would park the result
pub struct MockAudioExtractor {
    prefix: String,
}

impl MockAudioExtractor {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_string() }
    }
}

#[async_trait]
impl AudioExtractor for MockAudioExtractor {
    async fn extract_audio(&self, asset: &MediaAsset, _payload: &[u8]) -> Result<String> {
        let safe = sanitize_file_name(&asset.label);
        let stem = safe.rsplit_once('.').map(|(s, _)| s).unwrap_or(&safe);
        Ok(format!("{}/extracted_audio/{}.mp3", self.prefix, stem))
    }
}

/// Extractor that always fails, for exercising degraded voice analysis
pub struct FailingAudioExtractor;

#[async_trait]
impl AudioExtractor for FailingAudioExtractor {
    async fn extract_audio(&self, asset: &MediaAsset, _payload: &[u8]) -> Result<String> {
        Err(KeepsakeError::Analysis(format!(
            "transcode failed for {}",
            asset.label
        )))
    }
}

/// Summarizer that condenses the description without an LLM
pub struct MockSummarizer;

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, description: &str) -> Result<String> {
        let mut summary: String = description.chars().take(120).collect();
        if summary.len() < description.len() {
            summary.push('…');
        }
        Ok(summary)
    }
}

/// Summarizer that always fails, for exercising the failure-marker path
pub struct FailingSummarizer;

#[async_trait]
impl Summarizer for FailingSummarizer {
    async fn summarize(&self, _description: &str) -> Result<String> {
        Err(KeepsakeError::ServiceUnavailable("summarizer offline".to_string()))
    }
}

/// Store that reads fine but refuses every save, for exercising persistence
/// failure handling
pub struct FailingAlbumStore;

#[async_trait]
impl AlbumStore for FailingAlbumStore {
    async fn fetch_albums(&self) -> Result<Vec<Album>> {
        Ok(Vec::new())
    }

    async fn save_albums(&self, _albums: &[Album]) -> Result<()> {
        Err(KeepsakeError::Persistence("album store write refused".to_string()))
    }
}
