// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Core data model: media assets, detection results, review decisions, albums
//!
//! Everything in this module is pure data. The analysis batch and the review
//! decisions cross a process boundary (the review UI lives elsewhere), so all
//! of these types round-trip through serde_json; `AnalysisBatch::verify_transfer_safe`
//! enforces that before a batch is handed out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{KeepsakeError, Result};

/// Album identifiers are opaque strings (`album_{uuid}` for albums created by
/// this subsystem; pre-existing stores may use any scheme).
pub type AlbumId = String;

/// URI scheme for process-local temporary locators. Assets carry one of these
/// only while an analysis task is running; a persisted asset never does.
pub const TEMP_SCHEME: &str = "temp://";

/// URI scheme for placeholder cover art. A cover with this scheme may still be
/// replaced; any other value is final.
pub const PLACEHOLDER_SCHEME: &str = "placeholder://";

/// Generic cover used when no face preview or visual media is available.
pub const PLACEHOLDER_COVER: &str = "placeholder://cover/generic";

/// Kind of a media asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Chat,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Chat => "chat",
        }
    }

    /// Image and video assets can serve as cover art and face-detection input.
    pub fn is_visual(&self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Video)
    }
}

/// Where an upload came from, best-effort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Upload,
    Whatsapp,
    Instagram,
    Facebook,
}

/// A single media item, either pending analysis or embedded in an album.
///
/// Invariant: once an asset is part of an `AnalysisBatch` or an `Album`, its
/// `locator` is persistent, never a `temp://` process-local resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Stable id, unique within a batch and globally once persisted
    pub id: String,
    pub kind: MediaKind,
    /// URI/path; temporary during analysis, persistent afterwards
    pub locator: String,
    /// Human-readable label (usually the original filename)
    pub label: String,
    #[serde(default)]
    pub origin: Origin,
    /// Full transcript text, chat kind only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

/// Axis-aligned bounding box of a detected face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// An operator's choice for a detected face or voice.
///
/// Replaces the sentinel strings (`null`, `"none"`, `"new_unnamed"`) the
/// review UI historically sent. "Unset" is the absence of an entry in
/// `ReviewDecisions`, not a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "album_id", rename_all = "snake_case")]
pub enum Assignment {
    /// Leave this detection unassigned
    Ignore,
    /// Create a fresh "Unnamed" album for it
    CreateNew,
    /// Assign to an existing (or just-created) album
    Target(AlbumId),
}

/// An operator's choice for a chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "album_id", rename_all = "snake_case")]
pub enum ChatAssignment {
    DoNotLink,
    Target(AlbumId),
}

/// A face found in one asset during analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    /// Batch-local correlation key, see [`face_temp_id`]
    pub temp_id: String,
    pub bounding_box: BoundingBox,
    /// Detection confidence in [0, 1]
    pub confidence: f64,
    /// Small base64 data-URL crop for the review UI, best-effort
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Review-time selection, unset until the operator decides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Assignment>,
}

/// A speaker identified in one asset's audio during analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedVoice {
    /// Batch-local correlation key, see [`voice_temp_id`]
    pub temp_id: String,
    /// Profile id from the recognition service
    pub profile_id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Assignment>,
}

/// Analysis output for a single analyzable asset.
///
/// Per-asset failures never abort the batch; they land in `error` and the
/// asset still contributes whatever partial results it has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAnalysisResult {
    /// The originating asset, already carrying its persistent locator
    pub asset: MediaAsset,
    pub faces: Vec<DetectedFace>,
    pub voice: Option<DetectedVoice>,
    /// Locator of the audio used for voice analysis (the asset itself for
    /// audio uploads, the extracted track for video). Reconciliation uses
    /// this for voice-sample selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_locator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A chat transcript awaiting a linking decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatLinkCandidate {
    /// Batch-unique file id assigned by the classifier
    pub file_id: String,
    pub file_name: String,
    #[serde(default)]
    pub origin: Origin,
    /// Full transcript text (placeholder text if the read failed)
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<ChatAssignment>,
}

/// Everything the review UI needs: per-asset results, chat candidates, and a
/// snapshot of the album collection at analysis time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisBatch {
    pub results: Vec<AssetAnalysisResult>,
    pub chats: Vec<ChatLinkCandidate>,
    pub existing_albums: Vec<Album>,
}

impl AnalysisBatch {
    /// Verify the batch can cross a pure-data transfer boundary.
    ///
    /// Rejects any asset still holding a `temp://` locator and proves a full
    /// serde_json round trip. Downstream steps assume pure-data input, so a
    /// failure here is a hard precondition violation, not a warning.
    pub fn verify_transfer_safe(&self) -> Result<()> {
        for result in &self.results {
            if result.asset.locator.starts_with(TEMP_SCHEME) {
                return Err(KeepsakeError::Boundary(format!(
                    "asset {} still holds temporary locator {}",
                    result.asset.id, result.asset.locator
                )));
            }
        }
        for album in &self.existing_albums {
            for media in &album.media {
                if media.locator.starts_with(TEMP_SCHEME) {
                    return Err(KeepsakeError::Boundary(format!(
                        "album {} media {} holds temporary locator",
                        album.id, media.id
                    )));
                }
            }
        }

        let encoded = serde_json::to_string(self)
            .map_err(|e| KeepsakeError::Boundary(format!("batch not serializable: {}", e)))?;
        let _: AnalysisBatch = serde_json::from_str(&encoded)
            .map_err(|e| KeepsakeError::Boundary(format!("batch does not round-trip: {}", e)))?;
        Ok(())
    }

    /// Find the analysis result owning a face temp id
    pub fn result_for_face(&self, temp_id: &str) -> Option<&AssetAnalysisResult> {
        self.results
            .iter()
            .find(|r| r.faces.iter().any(|f| f.temp_id == temp_id))
    }

    /// Find the analysis result owning a voice temp id
    pub fn result_for_voice(&self, temp_id: &str) -> Option<&AssetAnalysisResult> {
        self.results
            .iter()
            .find(|r| r.voice.as_ref().is_some_and(|v| v.temp_id == temp_id))
    }

    /// Find a chat candidate by file id
    pub fn chat_candidate(&self, file_id: &str) -> Option<&ChatLinkCandidate> {
        self.chats.iter().find(|c| c.file_id == file_id)
    }
}

/// The per-person aggregation of media and metadata. The only entity with a
/// lifecycle spanning batches: created on the first `CreateNew` decision,
/// mutated by later reconciliation runs, never deleted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: AlbumId,
    /// Person name; "Unnamed" until the operator renames it
    pub name: String,
    pub cover_image: String,
    pub media_count: usize,
    /// Media set, unique by asset id; order carries no meaning
    pub media: Vec<MediaAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_sample: Option<String>,
    /// Generated prose, or a bracketed marker when generation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Album {
    pub fn new(id: AlbumId, name: impl Into<String>, cover_image: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cover_image: cover_image.into(),
            media_count: 0,
            media: Vec::new(),
            voice_sample: None,
            summary: None,
            updated_at: Utc::now(),
        }
    }

    pub fn contains_media(&self, asset_id: &str) -> bool {
        self.media.iter().any(|m| m.id == asset_id)
    }

    /// Add an asset to the media set, deduplicated by asset id.
    /// Returns `false` if it was already present.
    pub fn add_media(&mut self, asset: MediaAsset) -> bool {
        if self.contains_media(&asset.id) {
            return false;
        }
        self.media.push(asset);
        self.media_count = self.media.len();
        self.updated_at = Utc::now();
        true
    }

    /// True while the cover is empty or still the generic placeholder.
    /// Once a real cover (face preview or media locator) is set it is final.
    pub fn has_placeholder_cover(&self) -> bool {
        self.cover_image.is_empty() || self.cover_image.starts_with(PLACEHOLDER_SCHEME)
    }

    pub fn has_voice_sample(&self) -> bool {
        self.voice_sample.is_some()
    }
}

/// Generate a fresh album id
pub fn new_album_id() -> AlbumId {
    format!("album_{}", uuid::Uuid::new_v4())
}

/// Batch-local correlation key for the `index`-th face found in an asset.
///
/// Internal only: these ids order deterministically (asset id, then index),
/// which is what makes "first decision wins" reproducible. They are never
/// persisted or exposed as permanent identifiers.
pub fn face_temp_id(asset_id: &str, index: usize) -> String {
    format!("{}_face_{}", asset_id, index)
}

/// Batch-local correlation key for the voice identified in an asset
pub fn voice_temp_id(asset_id: &str, profile_id: &str) -> String {
    format!("{}_voice_{}", asset_id, profile_id)
}

/// The operator's decisions from the review step. This is the only input the
/// reconciliation engine trusts for intent.
///
/// BTreeMaps give the deterministic iteration order that the tie-break rules
/// ("first decision wins") rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewDecisions {
    /// face temp id → assignment
    #[serde(default)]
    pub faces: BTreeMap<String, Assignment>,
    /// voice temp id → assignment
    #[serde(default)]
    pub voices: BTreeMap<String, Assignment>,
    /// chat file id → link decision
    #[serde(default)]
    pub chats: BTreeMap<String, ChatAssignment>,
}

impl ReviewDecisions {
    /// Verify the decisions round-trip through a pure-data boundary
    pub fn verify_transfer_safe(&self) -> Result<()> {
        let encoded = serde_json::to_string(self)
            .map_err(|e| KeepsakeError::Boundary(format!("decisions not serializable: {}", e)))?;
        let _: ReviewDecisions = serde_json::from_str(&encoded)
            .map_err(|e| KeepsakeError::Boundary(format!("decisions do not round-trip: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, kind: MediaKind) -> MediaAsset {
        MediaAsset {
            id: id.to_string(),
            kind,
            locator: format!("persistent/{}/{}", kind.as_str(), id),
            label: id.to_string(),
            origin: Origin::Upload,
            transcript: None,
        }
    }

    #[test]
    fn test_temp_id_construction() {
        assert_eq!(face_temp_id("upload_0_img.jpg", 2), "upload_0_img.jpg_face_2");
        assert_eq!(voice_temp_id("upload_1_a.mp3", "v_alex"), "upload_1_a.mp3_voice_v_alex");
    }

    #[test]
    fn test_assignment_serde_round_trip() {
        let decisions = ReviewDecisions {
            faces: [
                ("f0".to_string(), Assignment::CreateNew),
                ("f1".to_string(), Assignment::Target("album_x".to_string())),
                ("f2".to_string(), Assignment::Ignore),
            ]
            .into_iter()
            .collect(),
            voices: BTreeMap::new(),
            chats: [("c0".to_string(), ChatAssignment::DoNotLink)].into_iter().collect(),
        };

        let json = serde_json::to_string(&decisions).unwrap();
        let back: ReviewDecisions = serde_json::from_str(&json).unwrap();
        assert_eq!(decisions, back);
        assert_eq!(back.faces["f1"], Assignment::Target("album_x".to_string()));
    }

    #[test]
    fn test_album_media_dedup() {
        let mut album = Album::new("a1".to_string(), "Unnamed", PLACEHOLDER_COVER);
        assert!(album.add_media(asset("m1", MediaKind::Image)));
        assert!(!album.add_media(asset("m1", MediaKind::Image)));
        assert!(album.add_media(asset("m2", MediaKind::Audio)));
        assert_eq!(album.media_count, 2);
    }

    #[test]
    fn test_placeholder_cover_detection() {
        let mut album = Album::new("a1".to_string(), "Unnamed", PLACEHOLDER_COVER);
        assert!(album.has_placeholder_cover());
        album.cover_image = String::new();
        assert!(album.has_placeholder_cover());
        album.cover_image = "persistent/image/abcd_photo.jpg".to_string();
        assert!(!album.has_placeholder_cover());
    }

    #[test]
    fn test_transfer_safety_rejects_temp_locator() {
        let mut a = asset("m1", MediaKind::Image);
        a.locator = format!("{}upload/m1", TEMP_SCHEME);
        let batch = AnalysisBatch {
            results: vec![AssetAnalysisResult {
                asset: a,
                faces: vec![],
                voice: None,
                audio_locator: None,
                error: None,
            }],
            chats: vec![],
            existing_albums: vec![],
        };
        assert!(matches!(
            batch.verify_transfer_safe(),
            Err(KeepsakeError::Boundary(_))
        ));
    }

    #[test]
    fn test_transfer_safety_accepts_pure_batch() {
        let batch = AnalysisBatch {
            results: vec![AssetAnalysisResult {
                asset: asset("m1", MediaKind::Image),
                faces: vec![DetectedFace {
                    temp_id: face_temp_id("m1", 0),
                    bounding_box: BoundingBox { x: 1, y: 2, width: 3, height: 4 },
                    confidence: 0.9,
                    preview: None,
                    decision: None,
                }],
                voice: None,
                audio_locator: None,
                error: None,
            }],
            chats: vec![],
            existing_albums: vec![],
        };
        batch.verify_transfer_safe().unwrap();
    }
}
