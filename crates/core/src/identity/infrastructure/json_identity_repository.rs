use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::identity::domain::identity_repository::IdentityRepository;
use crate::identity::domain::identity_store::{IdentityRecord, IdentityStore, IdentityStoreError};
use crate::shared::atomic_write::write_atomic;
use crate::shared::constants::{APP_DIR_NAME, IDENTITY_STORE_FILENAME};

/// On-disk layout: parallel `embeddings`/`ids` lists plus the ID counter.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredIdentities {
    embeddings: Vec<Vec<f32>>,
    ids: Vec<u32>,
    next_id: u32,
}

/// Persists the identity store as a single JSON file.
///
/// Saves go through a temp file and rename so an interrupted run never
/// leaves a half-written store behind.
pub struct JsonIdentityRepository {
    path: PathBuf,
}

impl JsonIdentityRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Platform-specific default store location.
    ///
    /// - macOS: `~/Library/Application Support/Locus/known_faces.json`
    /// - Linux: `$XDG_DATA_HOME/Locus/known_faces.json` or `~/.local/share/Locus/known_faces.json`
    /// - Windows: `%APPDATA%/Locus/known_faces.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join(APP_DIR_NAME).join(IDENTITY_STORE_FILENAME))
    }

    fn corrupt(&self, reason: impl Into<String>) -> IdentityStoreError {
        IdentityStoreError::CorruptStore {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }
}

impl IdentityRepository for JsonIdentityRepository {
    fn load(&self) -> Result<IdentityStore, IdentityStoreError> {
        if !self.path.exists() {
            log::info!(
                "No existing identity store at {}. Starting fresh.",
                self.path.display()
            );
            return Ok(IdentityStore::new());
        }

        let json = fs::read_to_string(&self.path).map_err(|e| IdentityStoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        let stored: StoredIdentities =
            serde_json::from_str(&json).map_err(|e| self.corrupt(e.to_string()))?;

        if stored.embeddings.len() != stored.ids.len() {
            return Err(self.corrupt(format!(
                "{} embeddings but {} ids",
                stored.embeddings.len(),
                stored.ids.len()
            )));
        }

        let records = stored
            .embeddings
            .into_iter()
            .zip(stored.ids)
            .map(|(embedding, person_id)| IdentityRecord {
                embedding,
                person_id,
            })
            .collect();
        let store = IdentityStore::from_parts(records, stored.next_id)
            .map_err(|reason| self.corrupt(reason))?;

        log::info!(
            "Loaded identity store with {} faces from {}",
            store.len(),
            self.path.display()
        );
        Ok(store)
    }

    fn save(&self, store: &IdentityStore) -> Result<(), IdentityStoreError> {
        let stored = StoredIdentities {
            embeddings: store.records().iter().map(|r| r.embedding.clone()).collect(),
            ids: store.records().iter().map(|r| r.person_id).collect(),
            next_id: store.next_id(),
        };
        let bytes = serde_json::to_vec(&stored).map_err(IdentityStoreError::Serialize)?;
        write_atomic(&self.path, &bytes).map_err(|e| IdentityStoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        log::info!(
            "Saved identity store with {} faces to {}",
            store.len(),
            self.path.display()
        );
        Ok(())
    }
}
