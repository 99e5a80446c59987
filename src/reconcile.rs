// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Reconciliation engine: merges review decisions into the album collection
//!
//! Processing order is fixed: face decisions, then voice decisions, then chat
//! links, then summary regeneration, then one bulk save. The decision loops
//! run serialized over a single in-memory collection: the per-run tracking
//! sets are what make the tie-break rules hold, and decision volume per batch
//! is small. Summary regeneration fans out concurrently once placement is
//! final.

use futures_util::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classify::sanitize_file_name;
use crate::config::StorageConfig;
use crate::model::{
    new_album_id, Album, AlbumId, AnalysisBatch, AssetAnalysisResult, Assignment, ChatAssignment,
    MediaAsset, MediaKind, ReviewDecisions,
};
use crate::services::{AlbumStore, Summarizer};
use crate::summary::SummaryGenerator;
use crate::Result;

/// What a reconciliation run did, for the caller's benefit
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The full persisted collection after the run
    pub albums: Vec<Album>,
    /// Albums created by this run
    pub created: Vec<AlbumId>,
    /// Pre-existing albums that gained media this run
    pub updated: Vec<AlbumId>,
}

/// Per-run bookkeeping behind the tie-break rules
#[derive(Default)]
struct RunTracking {
    /// Albums created this run
    created: BTreeSet<AlbumId>,
    /// Media ids added per album this run
    added: BTreeMap<AlbumId, BTreeSet<String>>,
    /// Assets placed by a face decision; gates the voice pass so one asset is
    /// never added twice when face and voice decisions disagree
    face_placed: BTreeSet<String>,
}

impl RunTracking {
    fn record_added(&mut self, album_id: &str, media_id: &str) {
        self.added
            .entry(album_id.to_string())
            .or_default()
            .insert(media_id.to_string());
    }

    /// Summary regeneration predicate: new this run, or gained media this run
    fn touched(&self, album_id: &str) -> bool {
        self.created.contains(album_id)
            || self.added.get(album_id).is_some_and(|set| !set.is_empty())
    }
}

/// The audio source an album's voice sample would come from, for one asset
fn voice_sample_source(result: &AssetAnalysisResult) -> Option<String> {
    match result.asset.kind {
        MediaKind::Audio => Some(result.asset.locator.clone()),
        MediaKind::Video => result.audio_locator.clone(),
        _ => None,
    }
}

/// Applies review decisions against a fresh album snapshot and persists the
/// result
pub struct ReconciliationEngine {
    store: Arc<dyn AlbumStore>,
    summaries: SummaryGenerator,
    storage: StorageConfig,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn AlbumStore>,
        summarizer: Arc<dyn Summarizer>,
        storage: StorageConfig,
    ) -> Self {
        Self {
            store,
            summaries: SummaryGenerator::new(summarizer),
            storage,
        }
    }

    /// Run one reconciliation: faces → voices → chats → summaries → save.
    ///
    /// The batch and decisions must be pure data (checked up front, before
    /// any side effect). Albums are refetched here rather than reused from
    /// analysis time, so decisions apply to current state. A save failure
    /// fails the whole run; no partial persistence is assumed.
    pub async fn finalize(
        &self,
        decisions: &ReviewDecisions,
        batch: &AnalysisBatch,
    ) -> Result<ReconcileOutcome> {
        batch.verify_transfer_safe()?;
        decisions.verify_transfer_safe()?;

        let mut albums: BTreeMap<AlbumId, Album> = self
            .store
            .fetch_albums()
            .await?
            .into_iter()
            .map(|a| (a.id.clone(), a))
            .collect();
        info!(
            "Reconciling {} face, {} voice, {} chat decisions against {} albums",
            decisions.faces.len(),
            decisions.voices.len(),
            decisions.chats.len(),
            albums.len()
        );

        let mut run = RunTracking::default();

        self.apply_face_decisions(decisions, batch, &mut albums, &mut run);
        self.apply_voice_decisions(decisions, batch, &mut albums, &mut run);
        self.link_chats(decisions, batch, &mut albums, &mut run);
        self.regenerate_summaries(&mut albums, &run).await;

        let final_albums: Vec<Album> = albums.into_values().collect();
        self.store.save_albums(&final_albums).await?;
        info!("Persisted {} albums", final_albums.len());

        let created: Vec<AlbumId> = run.created.iter().cloned().collect();
        let updated: Vec<AlbumId> = run
            .added
            .keys()
            .filter(|id| !run.created.contains(*id))
            .cloned()
            .collect();
        Ok(ReconcileOutcome {
            albums: final_albums,
            created,
            updated,
        })
    }

    /// Step 1: face decisions. Each non-ignored face decision places the
    /// owning asset into its target album (deduplicated per album by asset
    /// id); two faces in one asset may legitimately fan the asset out to two
    /// albums.
    fn apply_face_decisions(
        &self,
        decisions: &ReviewDecisions,
        batch: &AnalysisBatch,
        albums: &mut BTreeMap<AlbumId, Album>,
        run: &mut RunTracking,
    ) {
        for (temp_id, assignment) in &decisions.faces {
            if *assignment == Assignment::Ignore {
                debug!("Ignoring face {}", temp_id);
                continue;
            }
            let Some(result) = batch.result_for_face(temp_id) else {
                warn!("No analysis result for face {}, skipping", temp_id);
                continue;
            };
            let Some(face) = result.faces.iter().find(|f| f.temp_id == *temp_id) else {
                continue;
            };
            let asset = &result.asset;

            let album_id = match assignment {
                Assignment::Ignore => continue,
                Assignment::CreateNew => {
                    let id = new_album_id();
                    let cover = face
                        .preview
                        .clone()
                        .or_else(|| asset.kind.is_visual().then(|| asset.locator.clone()))
                        .unwrap_or_else(|| self.storage.placeholder_cover.clone());
                    let mut album = Album::new(id.clone(), "Unnamed", cover);

                    // Same asset, voice also CreateNew: one merged album, the
                    // voice sample seeded from this asset.
                    if let Some(voice) = &result.voice {
                        if decisions.voices.get(&voice.temp_id) == Some(&Assignment::CreateNew) {
                            album.voice_sample = voice_sample_source(result);
                        }
                    }

                    info!("Created album {} for face {} ({})", id, temp_id, asset.label);
                    albums.insert(id.clone(), album);
                    run.created.insert(id.clone());
                    id
                }
                Assignment::Target(id) => {
                    if !albums.contains_key(id) {
                        warn!("Target album {} not found for face {}, skipping", id, temp_id);
                        continue;
                    }
                    id.clone()
                }
            };

            let Some(album) = albums.get_mut(&album_id) else {
                continue;
            };

            if album.add_media(asset.clone()) {
                run.record_added(&album_id, &asset.id);
                debug!("Placed {} into album {} via face {}", asset.id, album_id, temp_id);

                if album.has_placeholder_cover() {
                    if let Some(preview) = &face.preview {
                        album.cover_image = preview.clone();
                    } else if asset.kind.is_visual() {
                        album.cover_image = asset.locator.clone();
                    }
                }

                if album.voice_sample.is_none() {
                    if let Some(voice) = &result.voice {
                        let targets_here = matches!(
                            decisions.voices.get(&voice.temp_id),
                            Some(Assignment::Target(t)) if *t == album_id
                        );
                        if targets_here {
                            album.voice_sample = voice_sample_source(result);
                        }
                    }
                }
            } else {
                debug!("{} already in album {}", asset.id, album_id);
            }

            run.face_placed.insert(asset.id.clone());
        }
    }

    /// Step 2: direct voice assignments, for assets whose faces never placed
    /// them (no faces, or all face decisions ignored/unresolved)
    fn apply_voice_decisions(
        &self,
        decisions: &ReviewDecisions,
        batch: &AnalysisBatch,
        albums: &mut BTreeMap<AlbumId, Album>,
        run: &mut RunTracking,
    ) {
        for (temp_id, assignment) in &decisions.voices {
            if *assignment == Assignment::Ignore {
                debug!("Ignoring voice {}", temp_id);
                continue;
            }
            let Some(result) = batch.result_for_voice(temp_id) else {
                warn!("No analysis result for voice {}, skipping", temp_id);
                continue;
            };
            let Some(voice) = result.voice.as_ref() else {
                continue;
            };
            let asset = &result.asset;

            if run.face_placed.contains(&asset.id) {
                debug!(
                    "Skipping voice {}: asset {} already placed via a face decision",
                    temp_id, asset.id
                );
                continue;
            }

            let album_id = match assignment {
                Assignment::Ignore => continue,
                Assignment::CreateNew => {
                    let id = new_album_id();
                    let mut album = Album::new(
                        id.clone(),
                        format!("Unnamed ({})", voice.display_name),
                        self.storage.placeholder_cover.clone(),
                    );
                    album.voice_sample = voice_sample_source(result);
                    info!("Created album {} for voice {} ({})", id, temp_id, asset.label);
                    albums.insert(id.clone(), album);
                    run.created.insert(id.clone());
                    id
                }
                Assignment::Target(id) => {
                    if !albums.contains_key(id) {
                        warn!("Target album {} not found for voice {}, skipping", id, temp_id);
                        continue;
                    }
                    id.clone()
                }
            };

            let Some(album) = albums.get_mut(&album_id) else {
                continue;
            };

            if album.add_media(asset.clone()) {
                run.record_added(&album_id, &asset.id);
                debug!("Placed {} into album {} via voice {}", asset.id, album_id, temp_id);

                if album.voice_sample.is_none() {
                    album.voice_sample = voice_sample_source(result);
                }
                if asset.kind.is_visual() && album.has_placeholder_cover() {
                    album.cover_image = asset.locator.clone();
                }
            } else {
                debug!("{} already in album {}", asset.id, album_id);
            }
        }
    }

    /// Step 3: chat linking. Builds a chat-kind media asset with a persistent
    /// locator and links it into the target album, deduplicated by locator.
    fn link_chats(
        &self,
        decisions: &ReviewDecisions,
        batch: &AnalysisBatch,
        albums: &mut BTreeMap<AlbumId, Album>,
        run: &mut RunTracking,
    ) {
        for (file_id, assignment) in &decisions.chats {
            let album_id = match assignment {
                ChatAssignment::DoNotLink => {
                    debug!("Not linking chat {}", file_id);
                    continue;
                }
                ChatAssignment::Target(id) => id,
            };

            let Some(chat) = batch.chat_candidate(file_id) else {
                warn!("No chat candidate for file id {}, skipping", file_id);
                continue;
            };
            let Some(album) = albums.get_mut(album_id) else {
                warn!(
                    "Target album {} not found for chat {}, skipping",
                    album_id, chat.file_name
                );
                continue;
            };

            let locator = format!(
                "{}/chat/{}_{}",
                self.storage.prefix,
                chat.file_id,
                sanitize_file_name(&chat.file_name)
            );

            // A file id maps to one asset per run; locator equality is the
            // defensive check against replays.
            if album
                .media
                .iter()
                .any(|m| m.kind == MediaKind::Chat && m.locator == locator)
            {
                debug!("Chat {} already linked to album {}", chat.file_name, album_id);
                continue;
            }

            let chat_asset = MediaAsset {
                id: format!("chat_{}", chat.file_id),
                kind: MediaKind::Chat,
                locator,
                label: format!("Chat: {}", chat.file_name),
                origin: chat.origin,
                transcript: Some(chat.transcript.clone()),
            };
            let media_id = chat_asset.id.clone();

            if album.add_media(chat_asset) {
                run.record_added(album_id, &media_id);
                info!("Linked chat {} to album {}", chat.file_name, album_id);
            }
        }
    }

    /// Step 4: regenerate summaries for every album the run created or fed.
    /// Runs concurrently; failures degrade to marker strings inside the
    /// generator, so this step cannot fail the run.
    async fn regenerate_summaries(
        &self,
        albums: &mut BTreeMap<AlbumId, Album>,
        run: &RunTracking,
    ) {
        let targets: Vec<AlbumId> = albums
            .keys()
            .filter(|id| run.touched(id))
            .cloned()
            .collect();
        if targets.is_empty() {
            return;
        }
        info!("Regenerating summaries for {} albums", targets.len());

        let futures = targets.iter().map(|id| {
            let album = &albums[id];
            async move { (id.clone(), self.summaries.regenerate(album).await) }
        });
        let summaries = join_all(futures).await;

        for (id, summary) in summaries {
            if let Some(album) = albums.get_mut(&id) {
                album.summary = Some(summary);
            }
        }
    }
}
