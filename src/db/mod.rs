// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Keepsake contributors

//! Album store gateway: SQLite-backed and in-memory implementations
//!
//! The store holds the only state that outlives a batch. Both implementations
//! expose bulk snapshot semantics: `save_albums` replaces the whole
//! collection atomically or not at all.

use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::model::{Album, AlbumId};
use crate::services::AlbumStore;
use crate::{KeepsakeError, Result};

/// SQLite-backed album store (thread-safe wrapper)
#[derive(Clone)]
pub struct SqliteAlbumStore {
    conn: Arc<Mutex<Connection>>,
}

/// Store statistics
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub album_count: i64,
    pub media_count: i64,
}

impl SqliteAlbumStore {
    /// Open or create the store
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.initialize()?;
        Ok(store)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| KeepsakeError::Persistence("Album store lock poisoned".to_string()))
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS albums (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                payload TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_albums_name ON albums(name);
        "#,
        )?;
        Ok(())
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock_conn()?;
        let album_count: i64 = conn.query_row("SELECT COUNT(*) FROM albums", [], |row| row.get(0))?;
        drop(conn);

        let media_count = self
            .fetch_all()?
            .iter()
            .map(|a| a.media.len() as i64)
            .sum();
        Ok(StoreStats { album_count, media_count })
    }

    fn fetch_all(&self) -> Result<Vec<Album>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT payload FROM albums ORDER BY id")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut albums = Vec::with_capacity(rows.len());
        for payload in rows {
            let album: Album = serde_json::from_str(&payload)?;
            albums.push(album);
        }
        Ok(albums)
    }

    fn save_all(&self, albums: &[Album]) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| KeepsakeError::Persistence(format!("cannot begin transaction: {}", e)))?;

        // Snapshot semantics: the incoming collection replaces everything.
        tx.execute("DELETE FROM albums", [])?;
        for album in albums {
            let payload = serde_json::to_string(album)?;
            tx.execute(
                "INSERT INTO albums (id, name, payload, updated_at) VALUES (?1, ?2, ?3, ?4)",
                params![album.id, album.name, payload, album.updated_at.to_rfc3339()],
            )?;
        }

        tx.commit()
            .map_err(|e| KeepsakeError::Persistence(format!("commit failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl AlbumStore for SqliteAlbumStore {
    async fn fetch_albums(&self) -> Result<Vec<Album>> {
        self.fetch_all()
    }

    async fn save_albums(&self, albums: &[Album]) -> Result<()> {
        self.save_all(albums)
    }
}

/// In-memory album store. Stands in for a remote collection during tests and
/// offline runs; same snapshot semantics as the SQLite store.
#[derive(Clone, Default)]
pub struct MemoryAlbumStore {
    albums: Arc<Mutex<BTreeMap<AlbumId, Album>>>,
}

impl MemoryAlbumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store
    pub fn with_albums(albums: Vec<Album>) -> Self {
        let map = albums.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            albums: Arc::new(Mutex::new(map)),
        }
    }
}

#[async_trait]
impl AlbumStore for MemoryAlbumStore {
    async fn fetch_albums(&self) -> Result<Vec<Album>> {
        let albums = self
            .albums
            .lock()
            .map_err(|_| KeepsakeError::Persistence("Album store lock poisoned".to_string()))?;
        // Deep copy so callers never mutate the canonical state directly
        Ok(albums.values().cloned().collect())
    }

    async fn save_albums(&self, incoming: &[Album]) -> Result<()> {
        let mut albums = self
            .albums
            .lock()
            .map_err(|_| KeepsakeError::Persistence("Album store lock poisoned".to_string()))?;
        *albums = incoming.iter().map(|a| (a.id.clone(), a.clone())).collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MediaAsset, MediaKind, Origin, PLACEHOLDER_COVER};

    fn album(id: &str, media_ids: &[&str]) -> Album {
        let mut album = Album::new(id.to_string(), "Unnamed", PLACEHOLDER_COVER);
        for mid in media_ids {
            album.add_media(MediaAsset {
                id: mid.to_string(),
                kind: MediaKind::Image,
                locator: format!("persistent/image/{}", mid),
                label: mid.to_string(),
                origin: Origin::Upload,
                transcript: None,
            });
        }
        album
    }

    #[tokio::test]
    async fn test_sqlite_round_trip() {
        let store = SqliteAlbumStore::in_memory().unwrap();
        assert!(store.fetch_albums().await.unwrap().is_empty());

        store
            .save_albums(&[album("a1", &["m1", "m2"]), album("a2", &[])])
            .await
            .unwrap();

        let albums = store.fetch_albums().await.unwrap();
        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].id, "a1");
        assert_eq!(albums[0].media_count, 2);
    }

    #[tokio::test]
    async fn test_sqlite_save_is_snapshot() {
        let store = SqliteAlbumStore::in_memory().unwrap();
        store.save_albums(&[album("a1", &[]), album("a2", &[])]).await.unwrap();
        store.save_albums(&[album("a2", &["m9"])]).await.unwrap();

        let albums = store.fetch_albums().await.unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].id, "a2");
    }

    #[tokio::test]
    async fn test_sqlite_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("albums.db");
        {
            let store = SqliteAlbumStore::open(&path).unwrap();
            store.save_albums(&[album("a1", &["m1"])]).await.unwrap();
        }
        let reopened = SqliteAlbumStore::open(&path).unwrap();
        let albums = reopened.fetch_albums().await.unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(reopened.stats().unwrap().media_count, 1);
    }

    #[tokio::test]
    async fn test_memory_store_returns_copies() {
        let store = MemoryAlbumStore::with_albums(vec![album("a1", &["m1"])]);
        let mut fetched = store.fetch_albums().await.unwrap();
        fetched[0].name = "Mutated".to_string();

        let fresh = store.fetch_albums().await.unwrap();
        assert_eq!(fresh[0].name, "Unnamed");
    }
}
