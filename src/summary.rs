// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Album summary generation with fault isolation
//!
//! Builds a textual description from album state (never from raw detection
//! internals) and hands it to the Summarizer collaborator. Failures are
//! converted into visible marker strings so a broken summarizer is
//! distinguishable from "no summary yet". No retries.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::model::{Album, MediaKind};
use crate::services::Summarizer;

/// Marker stored for albums that end a run with no media
pub const EMPTY_ALBUM_SUMMARY: &str = "[Empty album]";

/// How much transcript to quote in the description
const TRANSCRIPT_SNIPPET_CHARS: usize = 120;

/// Wraps the Summarizer collaborator with description construction
pub struct SummaryGenerator {
    summarizer: Arc<dyn Summarizer>,
}

impl SummaryGenerator {
    pub fn new(summarizer: Arc<dyn Summarizer>) -> Self {
        Self { summarizer }
    }

    /// Compose the description the summarizer sees. Built from album state
    /// only: name, per-kind counts, voice sample availability, and a snippet
    /// of the first linked transcript if any.
    pub fn describe(album: &Album) -> String {
        let subject = if album.name.starts_with("Unnamed") {
            "an unnamed person".to_string()
        } else {
            album.name.clone()
        };

        let mut counts = [0usize; 4];
        for media in &album.media {
            let slot = match media.kind {
                MediaKind::Image => 0,
                MediaKind::Video => 1,
                MediaKind::Audio => 2,
                MediaKind::Chat => 3,
            };
            counts[slot] += 1;
        }
        let breakdown: Vec<String> = [
            (counts[0], "image"),
            (counts[1], "video"),
            (counts[2], "audio"),
            (counts[3], "chat"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, kind)| format!("{} {}", n, kind))
        .collect();

        let mut description = format!(
            "Album for {}, containing {} items ({}).",
            subject,
            album.media_count,
            breakdown.join(", ")
        );
        if album.has_voice_sample() {
            description.push_str(" Voice sample available.");
        }

        if let Some(snippet) = album
            .media
            .iter()
            .find(|m| m.kind == MediaKind::Chat)
            .and_then(|m| m.transcript.as_deref())
        {
            let snippet: String = snippet.chars().take(TRANSCRIPT_SNIPPET_CHARS).collect();
            description.push_str(&format!(" Transcript excerpt: \"{}\"", snippet.trim()));
        }

        description
    }

    /// Produce the new summary text for an album. Infallible by design:
    /// a summarizer error becomes a bracketed marker string.
    pub async fn regenerate(&self, album: &Album) -> String {
        if album.media.is_empty() {
            return EMPTY_ALBUM_SUMMARY.to_string();
        }

        let description = Self::describe(album);
        debug!("Summarizing album {} ({})", album.id, album.name);

        match self.summarizer.summarize(&description).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!("Summary generation failed for album {}: {}", album.id, e);
                format!("[Summary generation failed: {}]", e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MediaAsset, Origin, PLACEHOLDER_COVER};
    use crate::services::mock::{FailingSummarizer, MockSummarizer};

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

    fn album_with_media() -> Album {
        let mut album = Album::new("a1".to_string(), "Alex Johnson", PLACEHOLDER_COVER);
        album.add_media(asset("m1", MediaKind::Image));
        album.add_media(asset("m2", MediaKind::Image));
        album.add_media(asset("m3", MediaKind::Audio));
        album.voice_sample = Some("persistent/audio/m3".to_string());
        album
    }

    #[test]
    fn test_description_composition() {
        let description = SummaryGenerator::describe(&album_with_media());
        assert!(description.contains("Album for Alex Johnson"));
        assert!(description.contains("3 items"));
        assert!(description.contains("2 image"));
        assert!(description.contains("1 audio"));
        assert!(description.contains("Voice sample available."));
    }

    #[test]
    fn test_unnamed_albums_described_anonymously() {
        let mut album = album_with_media();
        album.name = "Unnamed (Alex J)".to_string();
        let description = SummaryGenerator::describe(&album);
        assert!(description.contains("an unnamed person"));
        assert!(!description.contains("Alex J"));
    }

    #[test]
    fn test_transcript_snippet_included() {
        let mut album = album_with_media();
        let mut chat = asset("c1", MediaKind::Chat);
        chat.transcript = Some("Chen: Let's meet tomorrow.\nYou: Sounds good".to_string());
        album.add_media(chat);

        let description = SummaryGenerator::describe(&album);
        assert!(description.contains("Transcript excerpt"));
        assert!(description.contains("Let's meet tomorrow."));
    }

    #[tokio::test]
    async fn test_failure_becomes_marker() {
        let generator = SummaryGenerator::new(Arc::new(FailingSummarizer));
        let summary = generator.regenerate(&album_with_media()).await;
        assert!(summary.starts_with("[Summary generation failed:"));
    }

    #[tokio::test]
    async fn test_empty_album_marker() {
        let generator = SummaryGenerator::new(Arc::new(MockSummarizer));
        let album = Album::new("a1".to_string(), "Unnamed", PLACEHOLDER_COVER);
        assert_eq!(generator.regenerate(&album).await, EMPTY_ALBUM_SUMMARY);
    }
}
