// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! End-to-end pipeline test: classification → analysis → review decisions →
//! reconciliation, over deterministic collaborators and an in-memory store.

use std::sync::Arc;

use keepsake::analyze::AnalysisOrchestrator;
use keepsake::classify::RawUpload;
use keepsake::config::StorageConfig;
use keepsake::db::MemoryAlbumStore;
use keepsake::model::{
    Album, AnalysisBatch, Assignment, ChatAssignment, MediaKind, ReviewDecisions,
    PLACEHOLDER_COVER, TEMP_SCHEME,
};
use keepsake::reconcile::ReconciliationEngine;
use keepsake::services::AlbumStore;
use keepsake::services::mock::{
    MockAudioExtractor, MockFaceDetector, MockSummarizer, MockVoiceIdentifier,
};
use keepsake::services::{Utf8ChatReader, VoiceProfile};

fn upload(name: &str, content_type: &str, bytes: &[u8]) -> RawUpload {
    RawUpload {
        file_name: name.to_string(),
        content_type: content_type.to_string(),
        bytes: bytes.to_vec(),
    }
}

fn orchestrator(store: MemoryAlbumStore, face_count: usize) -> AnalysisOrchestrator {
    AnalysisOrchestrator::new(
        Arc::new(MockFaceDetector::with_fixed_count(face_count)),
        Arc::new(MockVoiceIdentifier::with_profile(Some(VoiceProfile {
            id: "v_maria".to_string(),
            name: "Maria G".to_string(),
            confidence: Some(0.9),
        }))),
        Arc::new(MockAudioExtractor::new("persistent")),
        Arc::new(Utf8ChatReader),
        Arc::new(store),
        StorageConfig::default(),
    )
}

fn engine(store: MemoryAlbumStore) -> ReconciliationEngine {
    ReconciliationEngine::new(
        Arc::new(store),
        Arc::new(MockSummarizer),
        StorageConfig::default(),
    )
}

async fn analyze(store: &MemoryAlbumStore, face_count: usize, uploads: Vec<RawUpload>) -> AnalysisBatch {
    orchestrator(store.clone(), face_count)
        .analyze_uploads(uploads)
        .await
        .expect("analysis failed")
}

#[tokio::test]
async fn full_pipeline_builds_album_from_mixed_uploads() {
    let store = MemoryAlbumStore::new();

    let batch = analyze(
        &store,
        1,
        vec![
            upload("beach.jpg", "image/jpeg", b"jpeg bytes"),
            upload("birthday.mp4", "video/mp4", b"mp4 bytes"),
            upload("WhatsApp Chat with Maria.txt", "text/plain", b"Maria: see you soon!"),
        ],
    )
    .await;

    assert_eq!(batch.results.len(), 2);
    assert_eq!(batch.chats.len(), 1);
    assert!(batch.existing_albums.is_empty());
    for result in &batch.results {
        assert!(!result.asset.locator.starts_with(TEMP_SCHEME));
        assert_eq!(result.faces.len(), 1);
    }

    // The review UI would hand back decisions; simulate the operator creating
    // one album from the photo face, assigning the video face to it, and
    // linking the chat.
    let photo = &batch.results[0];
    let video = &batch.results[1];
    let chat = &batch.chats[0];

    let mut decisions = ReviewDecisions::default();
    decisions
        .faces
        .insert(photo.faces[0].temp_id.clone(), Assignment::CreateNew);

    // First pass: create the album
    let outcome = engine(store.clone()).finalize(&decisions, &batch).await.unwrap();
    assert_eq!(outcome.created.len(), 1);
    let album_id = outcome.created[0].clone();

    // Second pass: route the video and the chat into the created album
    let mut decisions = ReviewDecisions::default();
    decisions
        .faces
        .insert(video.faces[0].temp_id.clone(), Assignment::Target(album_id.clone()));
    decisions.voices.insert(
        video.voice.as_ref().unwrap().temp_id.clone(),
        Assignment::Target(album_id.clone()),
    );
    decisions
        .chats
        .insert(chat.file_id.clone(), ChatAssignment::Target(album_id.clone()));

    let outcome = engine(store.clone()).finalize(&decisions, &batch).await.unwrap();
    assert_eq!(outcome.albums.len(), 1);
    let album = &outcome.albums[0];

    assert_eq!(album.media_count, 3);
    assert!(album.contains_media(&photo.asset.id));
    assert!(album.contains_media(&video.asset.id));
    assert!(album.media.iter().any(|m| m.kind == MediaKind::Chat));
    // Voice targeted the same album the face placed the video in
    assert_eq!(
        album.voice_sample.as_deref(),
        Some("persistent/extracted_audio/birthday.mp3")
    );
    assert!(album.summary.is_some());

    // And the collection survives a fetch round trip
    let persisted = store.fetch_albums().await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].media_count, 3);
}

#[tokio::test]
async fn batch_serializes_for_the_review_boundary() {
    let store = MemoryAlbumStore::new();
    let batch = analyze(
        &store,
        2,
        vec![upload("group photo.jpg", "image/jpeg", b"not a real jpeg")],
    )
    .await;

    // The review UI lives in another process; the batch must survive the trip
    let json = serde_json::to_string(&batch).unwrap();
    let back: AnalysisBatch = serde_json::from_str(&json).unwrap();
    assert_eq!(batch, back);
    assert_eq!(back.results[0].faces.len(), 2);
}

#[tokio::test]
async fn replaying_the_same_decisions_is_idempotent() {
    let store = MemoryAlbumStore::with_albums(vec![Album::new(
        "album_existing".to_string(),
        "Maria Garcia",
        PLACEHOLDER_COVER,
    )]);

    let batch = analyze(&store, 1, vec![upload("maria.jpg", "image/jpeg", b"bytes")]).await;
    assert_eq!(batch.existing_albums.len(), 1);

    let mut decisions = ReviewDecisions::default();
    decisions.faces.insert(
        batch.results[0].faces[0].temp_id.clone(),
        Assignment::Target("album_existing".to_string()),
    );

    let eng = engine(store.clone());
    eng.finalize(&decisions, &batch).await.unwrap();
    let outcome = eng.finalize(&decisions, &batch).await.unwrap();

    assert_eq!(outcome.albums.len(), 1);
    assert_eq!(outcome.albums[0].media_count, 1);
    assert!(outcome.created.is_empty());
}

#[tokio::test]
async fn audio_upload_flows_into_voice_album() {
    let store = MemoryAlbumStore::new();
    let batch = analyze(&store, 0, vec![upload("memo.mp3", "audio/mpeg", b"audio")]).await;

    let result = &batch.results[0];
    assert!(result.faces.is_empty());
    let voice = result.voice.as_ref().expect("voice expected");

    let mut decisions = ReviewDecisions::default();
    decisions
        .voices
        .insert(voice.temp_id.clone(), Assignment::CreateNew);

    let outcome = engine(store).finalize(&decisions, &batch).await.unwrap();
    let album = &outcome.albums[0];
    assert_eq!(album.name, "Unnamed (Maria G)");
    // Audio uploads serve as their own voice sample
    assert_eq!(album.voice_sample.as_deref(), Some(result.asset.locator.as_str()));
    assert!(album.has_placeholder_cover());
}
