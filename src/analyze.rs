// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Analysis orchestrator: per-asset face/voice detection fan-out
//!
//! For each analyzable asset the orchestrator extracts audio where needed,
//! runs face detection and speaker identification concurrently, assigns the
//! final persistent locator, and folds everything into one [`AnalysisBatch`].
//! Per-asset failures are captured on the result; only a store fetch failure
//! or a transfer-safety violation aborts the batch.

use base64::{engine::general_purpose, Engine as _};
use futures_util::future::join_all;
use image::GenericImageView;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classify::{classify_uploads, sanitize_file_name, PendingAsset, PendingChat, RawUpload};
use crate::config::StorageConfig;
use crate::model::{
    face_temp_id, voice_temp_id, AnalysisBatch, AssetAnalysisResult, BoundingBox,
    ChatLinkCandidate, DetectedFace, DetectedVoice, MediaKind,
};
use crate::services::{AlbumStore, AudioExtractor, ChatReader, FaceDetector, VoiceIdentifier};
use crate::Result;

/// Temporary locator held for the duration of one analysis task.
/// Released (and logged) on every exit path when the task ends.
struct ScratchLocator {
    uri: String,
}

impl ScratchLocator {
    fn new(uri: String) -> Self {
        Self { uri }
    }
}

impl Drop for ScratchLocator {
    fn drop(&mut self) {
        debug!("Releasing temporary locator {}", self.uri);
    }
}

/// Build the persistent locator for an analyzed asset. The content hash
/// prefix keeps re-uploads of the same bytes from colliding with unrelated
/// files of the same name.
fn persistent_locator(prefix: &str, kind: MediaKind, label: &str, payload: &[u8]) -> String {
    let hash = blake3::hash(payload).to_hex();
    format!(
        "{}/{}/{}_{}",
        prefix,
        kind.as_str(),
        &hash.as_str()[..8],
        sanitize_file_name(label)
    )
}

/// Crop a face out of an image payload and return it as a small base64 JPEG
/// data URL for the review UI
fn crop_face_preview(payload: &[u8], bb: &BoundingBox) -> Result<String> {
    let img = image::load_from_memory(payload)?;
    let (width, height) = img.dimensions();

    let x = bb.x.min(width.saturating_sub(1));
    let y = bb.y.min(height.saturating_sub(1));
    let w = bb.width.clamp(1, width - x);
    let h = bb.height.clamp(1, height - y);

    let crop = img.crop_imm(x, y, w, h);
    let thumb = crop.resize(80, 80, image::imageops::FilterType::Triangle);

    let mut buffer = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Jpeg)?;
    Ok(format!(
        "data:image/jpeg;base64,{}",
        general_purpose::STANDARD.encode(&buffer)
    ))
}

/// Runs the analysis phase for one upload batch
pub struct AnalysisOrchestrator {
    face_detector: Arc<dyn FaceDetector>,
    voice_identifier: Arc<dyn VoiceIdentifier>,
    audio_extractor: Arc<dyn AudioExtractor>,
    chat_reader: Arc<dyn ChatReader>,
    store: Arc<dyn AlbumStore>,
    storage: StorageConfig,
}

impl AnalysisOrchestrator {
    pub fn new(
        face_detector: Arc<dyn FaceDetector>,
        voice_identifier: Arc<dyn VoiceIdentifier>,
        audio_extractor: Arc<dyn AudioExtractor>,
        chat_reader: Arc<dyn ChatReader>,
        store: Arc<dyn AlbumStore>,
        storage: StorageConfig,
    ) -> Self {
        Self {
            face_detector,
            voice_identifier,
            audio_extractor,
            chat_reader,
            store,
            storage,
        }
    }

    /// Classify and analyze a batch of raw uploads.
    ///
    /// All per-asset tasks run independently; chat reads and the album
    /// snapshot fetch run alongside them. The returned batch is verified
    /// transfer-safe; a violation rejects the whole batch before anything
    /// reaches review.
    pub async fn analyze_uploads(&self, uploads: Vec<RawUpload>) -> Result<AnalysisBatch> {
        let upload_count = uploads.len();
        let classified = classify_uploads(uploads);
        info!(
            "Analyzing {} media assets and {} chat files ({} uploads total)",
            classified.media.len(),
            classified.chats.len(),
            upload_count
        );

        let media_futures = classified.media.into_iter().map(|p| self.analyze_asset(p));
        let chat_futures = classified.chats.into_iter().map(|p| self.read_chat_candidate(p));

        let (results, chats, existing_albums) = tokio::join!(
            join_all(media_futures),
            join_all(chat_futures),
            self.store.fetch_albums(),
        );

        let batch = AnalysisBatch {
            results,
            chats,
            existing_albums: existing_albums?,
        };

        batch.verify_transfer_safe()?;
        info!(
            "Analysis complete: {} results, {} chat candidates, {} existing albums",
            batch.results.len(),
            batch.chats.len(),
            batch.existing_albums.len()
        );
        Ok(batch)
    }

    /// Analyze a single asset. Never fails: collaborator errors are folded
    /// into the result's `error` field and the asset keeps whatever partial
    /// results it has.
    async fn analyze_asset(&self, pending: PendingAsset) -> AssetAnalysisResult {
        let PendingAsset { mut asset, payload } = pending;
        let _scratch = ScratchLocator::new(std::mem::take(&mut asset.locator));
        let mut errors: Vec<String> = Vec::new();

        debug!("Analyzing {} ({})", asset.label, asset.kind.as_str());

        let persistent = persistent_locator(&self.storage.prefix, asset.kind, &asset.label, &payload);

        // Audio source for voice analysis: the extracted track for video,
        // the stored file itself for audio uploads.
        let audio_locator = match asset.kind {
            MediaKind::Video => match self.audio_extractor.extract_audio(&asset, &payload).await {
                Ok(locator) => Some(locator),
                Err(e) => {
                    warn!("Audio extraction failed for {}: {}", asset.label, e);
                    errors.push(format!("audio extraction failed: {}", e));
                    None
                }
            },
            MediaKind::Audio => Some(persistent.clone()),
            _ => None,
        };

        let face_task = async {
            if !asset.kind.is_visual() {
                return Ok(Vec::new());
            }
            self.face_detector.detect_faces(&asset, &payload).await
        };

        let voice_task = async {
            match &audio_locator {
                Some(locator) => self.voice_identifier.identify_speaker(locator).await,
                None => Ok(None),
            }
        };

        let (face_outcome, voice_outcome) = tokio::join!(face_task, voice_task);

        let faces = match face_outcome {
            Ok(detections) => {
                debug!("Found {} faces in {}", detections.len(), asset.label);
                detections
                    .into_iter()
                    .enumerate()
                    .map(|(index, detection)| {
                        // Preview crops are best-effort; only images can be
                        // decoded here (video frame grabs are the detector's
                        // business, not ours).
                        let preview = if asset.kind == MediaKind::Image {
                            crop_face_preview(&payload, &detection.bounding_box)
                                .map_err(|e| {
                                    warn!("Failed to crop face preview in {}: {}", asset.label, e)
                                })
                                .ok()
                        } else {
                            None
                        };
                        DetectedFace {
                            temp_id: face_temp_id(&asset.id, index),
                            bounding_box: detection.bounding_box,
                            confidence: detection.confidence,
                            preview,
                            decision: None,
                        }
                    })
                    .collect()
            }
            Err(e) => {
                warn!("Face detection failed for {}: {}", asset.label, e);
                errors.push(format!("face detection failed: {}", e));
                Vec::new()
            }
        };

        let voice = match voice_outcome {
            Ok(Some(profile)) => {
                debug!("Identified voice {} in {}", profile.name, asset.label);
                Some(DetectedVoice {
                    temp_id: voice_temp_id(&asset.id, &profile.id),
                    profile_id: profile.id,
                    display_name: profile.name,
                    decision: None,
                })
            }
            Ok(None) => {
                // No distinct speaker is a valid outcome
                None
            }
            Err(e) => {
                warn!("Voice identification failed for {}: {}", asset.label, e);
                errors.push(format!("voice identification failed: {}", e));
                None
            }
        };

        // Simulates/performs storage; the temporary locator dies with the
        // scratch guard when this task ends.
        asset.locator = persistent;

        AssetAnalysisResult {
            asset,
            faces,
            voice,
            audio_locator,
            error: if errors.is_empty() {
                None
            } else {
                Some(errors.join("; "))
            },
        }
    }

    /// Read one chat transcript; a failed read yields placeholder text, not
    /// an error
    async fn read_chat_candidate(&self, pending: PendingChat) -> ChatLinkCandidate {
        let transcript = match self
            .chat_reader
            .read_chat(&pending.file_name, &pending.payload)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read chat {}: {}", pending.file_name, e);
                format!("[Error reading content for {}]", pending.file_name)
            }
        };

        ChatLinkCandidate {
            file_id: pending.file_id,
            file_name: pending.file_name,
            origin: pending.origin,
            transcript,
            decision: None,
        }
    }
}
