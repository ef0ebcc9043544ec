//! Registry of known face identities.
//!
//! Every registered person keeps the first normalized embedding they were
//! seen with. New embeddings are matched by linear scan over that
//! reference set; anything below the threshold becomes a new person.

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::shared::embedding::{cosine_similarity, normalized};

#[derive(Error, Debug)]
pub enum IdentityStoreError {
    #[error("identity store {path} is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },
    #[error("failed to access identity store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize identity store: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("person id space exhausted (next id {next_id})")]
    IdsExhausted { next_id: u32 },
}

/// A reference embedding (unit L2 norm) and the person it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentityRecord {
    pub embedding: Vec<f32>,
    pub person_id: u32,
}

/// Best stored match for a query embedding.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IdentityMatch {
    pub person_id: u32,
    pub similarity: f32,
    /// Insertion index of the matched record.
    pub index: usize,
}

/// Not safe for concurrent registration: two callers could both miss and
/// allocate two IDs for one person. Callers hold it behind `&mut`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdentityStore {
    records: Vec<IdentityRecord>,
    next_id: u32,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from persisted parts, checking its invariants.
    ///
    /// Returns a human-readable reason when the parts do not form a valid
    /// store: duplicate person IDs, mixed embedding dimensions, or a
    /// `next_id` that would reuse an existing ID.
    pub fn from_parts(records: Vec<IdentityRecord>, next_id: u32) -> Result<Self, String> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert(record.person_id) {
                return Err(format!("duplicate person id {}", record.person_id));
            }
            if record.person_id >= next_id {
                return Err(format!(
                    "person id {} is not below next id {next_id}",
                    record.person_id
                ));
            }
        }
        if let Some(first) = records.first() {
            let dim = first.embedding.len();
            if let Some(bad) = records.iter().find(|r| r.embedding.len() != dim) {
                return Err(format!(
                    "person id {} has {}-dim embedding, expected {dim}",
                    bad.person_id,
                    bad.embedding.len()
                ));
            }
        }
        Ok(Self { records, next_id })
    }

    pub fn records(&self) -> &[IdentityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The ID the next registered person will receive.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Embedding dimension of the stored records, if any.
    pub fn dim(&self) -> Option<usize> {
        self.records.first().map(|r| r.embedding.len())
    }

    /// Read-only nearest-match query. Ties resolve to the earliest record.
    pub fn nearest(&self, embedding: &[f32]) -> Result<Option<IdentityMatch>, IdentityStoreError> {
        let query = normalize_or_keep(embedding);
        self.check_dim(query.len())?;
        Ok(self.best_match(&query))
    }

    /// Returns the person ID for `embedding`, registering a new person when
    /// no stored embedding reaches `threshold` (inclusive).
    ///
    /// When several records tie at the maximum similarity, the one inserted
    /// first wins. Zero-norm embeddings are logged and compared unnormalized.
    pub fn match_or_register(
        &mut self,
        embedding: &[f32],
        threshold: f32,
    ) -> Result<u32, IdentityStoreError> {
        let query = normalize_or_keep(embedding);
        self.check_dim(query.len())?;

        if let Some(best) = self.best_match(&query) {
            if best.similarity >= threshold {
                log::debug!(
                    "Match found for person ID {} with similarity {:.4}",
                    best.person_id,
                    best.similarity
                );
                return Ok(best.person_id);
            }
        }

        let person_id = self.next_id;
        self.next_id = person_id
            .checked_add(1)
            .ok_or(IdentityStoreError::IdsExhausted { next_id: person_id })?;
        self.records.push(IdentityRecord {
            embedding: query,
            person_id,
        });
        log::info!("New person detected with ID {person_id}");
        Ok(person_id)
    }

    fn best_match(&self, query: &[f32]) -> Option<IdentityMatch> {
        let mut best: Option<IdentityMatch> = None;
        for (index, record) in self.records.iter().enumerate() {
            let similarity = cosine_similarity(query, &record.embedding);
            if !similarity.is_finite() {
                log::warn!(
                    "Ignoring non-finite similarity against person ID {}",
                    record.person_id
                );
                continue;
            }
            // Strict `>` keeps the earliest record on ties.
            if best.map_or(true, |b| similarity > b.similarity) {
                best = Some(IdentityMatch {
                    person_id: record.person_id,
                    similarity,
                    index,
                });
            }
        }
        best
    }

    fn check_dim(&self, got: usize) -> Result<(), IdentityStoreError> {
        match self.dim() {
            Some(expected) if expected != got => {
                Err(IdentityStoreError::DimensionMismatch { expected, got })
            }
            _ => Ok(()),
        }
    }
}

fn normalize_or_keep(embedding: &[f32]) -> Vec<f32> {
    match normalized(embedding) {
        Ok(unit) => unit,
        Err(e) => {
            log::warn!("Encountered face embedding with zero norm ({e}); skipping normalization");
            embedding.to_vec()
        }
    }
}
