// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Asset classifier: sorts raw uploads into analyzable media and chat
//! transcripts

use tracing::{debug, warn};

use crate::model::{MediaAsset, MediaKind, Origin, TEMP_SCHEME};

/// A raw uploaded file as handed over by the caller: opaque bytes plus the
/// declared content type and filename
#[derive(Debug, Clone)]
pub struct RawUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// An analyzable asset together with its payload. The asset starts out with a
/// process-local `temp://` locator; analysis replaces it with a persistent
/// one.
#[derive(Debug, Clone)]
pub struct PendingAsset {
    pub asset: MediaAsset,
    pub payload: Vec<u8>,
}

/// A chat transcript stub; content is read later, during analysis
#[derive(Debug, Clone)]
pub struct PendingChat {
    pub file_id: String,
    pub file_name: String,
    pub origin: Origin,
    pub payload: Vec<u8>,
}

/// Classifier output: two disjoint lists
#[derive(Debug, Default)]
pub struct ClassifiedUploads {
    pub media: Vec<PendingAsset>,
    pub chats: Vec<PendingChat>,
}

/// Replace anything outside `[A-Za-z0-9._-]` with an underscore
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Batch-unique id for an upload, stable for the lifetime of one batch
fn upload_file_id(index: usize, file_name: &str) -> String {
    format!("upload_{}_{}", index, sanitize_file_name(file_name))
}

fn classify_kind(content_type: &str, file_name: &str) -> Option<MediaKind> {
    if content_type.starts_with("image/") {
        Some(MediaKind::Image)
    } else if content_type.starts_with("video/") {
        Some(MediaKind::Video)
    } else if content_type.starts_with("audio/") {
        Some(MediaKind::Audio)
    } else if content_type.starts_with("text/") || file_name.to_lowercase().ends_with(".txt") {
        Some(MediaKind::Chat)
    } else {
        None
    }
}

/// Best-effort chat origin from the filename
fn detect_origin(file_name: &str) -> Origin {
    let lower = file_name.to_lowercase();
    if lower.contains("whatsapp") {
        Origin::Whatsapp
    } else if lower.contains("instagram") {
        Origin::Instagram
    } else if lower.contains("facebook") {
        Origin::Facebook
    } else {
        Origin::Upload
    }
}

/// Sort a batch of raw uploads into analyzable media assets and chat
/// transcript stubs. Unrecognized content types are dropped with a warning;
/// the caller is not notified beyond the log.
pub fn classify_uploads(uploads: Vec<RawUpload>) -> ClassifiedUploads {
    let mut classified = ClassifiedUploads::default();

    for (index, upload) in uploads.into_iter().enumerate() {
        let file_id = upload_file_id(index, &upload.file_name);

        match classify_kind(&upload.content_type, &upload.file_name) {
            Some(MediaKind::Chat) => {
                debug!("Identified chat file: {}", upload.file_name);
                classified.chats.push(PendingChat {
                    file_id,
                    origin: detect_origin(&upload.file_name),
                    file_name: upload.file_name,
                    payload: upload.bytes,
                });
            }
            Some(kind) => {
                let asset = MediaAsset {
                    locator: format!("{}upload/{}", TEMP_SCHEME, file_id),
                    id: file_id,
                    kind,
                    label: upload.file_name,
                    origin: Origin::Upload,
                    transcript: None,
                };
                classified.media.push(PendingAsset {
                    asset,
                    payload: upload.bytes,
                });
            }
            None => {
                warn!(
                    "Skipping unsupported file type: {} ({})",
                    upload.file_name, upload.content_type
                );
            }
        }
    }

    classified
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, content_type: &str) -> RawUpload {
        RawUpload {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn test_classification_by_content_type() {
        let classified = classify_uploads(vec![
            upload("a.jpg", "image/jpeg"),
            upload("b.mp4", "video/mp4"),
            upload("c.mp3", "audio/mpeg"),
            upload("d.txt", "text/plain"),
        ]);

        assert_eq!(classified.media.len(), 3);
        assert_eq!(classified.chats.len(), 1);
        assert_eq!(classified.media[0].asset.kind, MediaKind::Image);
        assert_eq!(classified.media[1].asset.kind, MediaKind::Video);
        assert_eq!(classified.media[2].asset.kind, MediaKind::Audio);
    }

    #[test]
    fn test_txt_suffix_without_text_content_type() {
        let classified = classify_uploads(vec![upload("export.TXT", "application/octet-stream")]);
        assert_eq!(classified.chats.len(), 1);
        assert!(classified.media.is_empty());
    }

    #[test]
    fn test_unsupported_types_are_dropped_silently() {
        let classified = classify_uploads(vec![
            upload("archive.zip", "application/zip"),
            upload("a.jpg", "image/jpeg"),
        ]);
        assert_eq!(classified.media.len(), 1);
        assert!(classified.chats.is_empty());
    }

    #[test]
    fn test_chat_origin_detection() {
        let classified = classify_uploads(vec![
            upload("WhatsApp Chat with Sam.txt", "text/plain"),
            upload("instagram_export.txt", "text/plain"),
            upload("from-Facebook.txt", "text/plain"),
            upload("notes.txt", "text/plain"),
        ]);

        let origins: Vec<Origin> = classified.chats.iter().map(|c| c.origin).collect();
        assert_eq!(
            origins,
            vec![Origin::Whatsapp, Origin::Instagram, Origin::Facebook, Origin::Upload]
        );
    }

    #[test]
    fn test_media_assets_start_with_temp_locator() {
        let classified = classify_uploads(vec![upload("a photo.jpg", "image/jpeg")]);
        let asset = &classified.media[0].asset;
        assert!(asset.locator.starts_with(TEMP_SCHEME));
        assert_eq!(asset.id, "upload_0_a_photo.jpg");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("trip to the beach.mp4"), "trip_to_the_beach.mp4");
        assert_eq!(sanitize_file_name("весна@2026!.png"), "______2026_.png");
    }
}
