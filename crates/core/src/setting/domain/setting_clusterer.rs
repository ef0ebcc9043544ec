//! Per-person setting clustering.
//!
//! Each new frame of a person is compared against that person's earlier
//! frames, most recent first, and joins the cluster of the first frame the
//! oracle judges to be the same place. With no match it opens a new
//! cluster. Worst case is n(n-1)/2 oracle calls per person, but
//! consecutive frames usually share a setting and stop at the first
//! comparison.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::setting::domain::setting_oracle::SettingOracle;
use crate::shared::setting_id::SettingId;

/// One frame in which a person appears, addressed by scan position.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineEntry {
    pub scene_index: usize,
    pub frame_index: usize,
    pub frame_path: PathBuf,
}

/// All frames of one person in scan order (scenes, then frames).
#[derive(Clone, Debug, PartialEq)]
pub struct PersonTimeline {
    pub person_id: u32,
    pub entries: Vec<TimelineEntry>,
}

/// Setting assignment for a timeline, parallel to its entries.
#[derive(Clone, Debug, PartialEq)]
pub struct PersonClusters {
    pub person_id: u32,
    pub setting_ids: Vec<SettingId>,
    pub oracle_calls: usize,
    pub oracle_failures: usize,
}

impl PersonClusters {
    pub fn cluster_count(&self) -> usize {
        self.setting_ids
            .iter()
            .map(|id| id.local_index)
            .max()
            .map_or(0, |max| max as usize + 1)
    }
}

#[derive(Clone)]
pub struct SettingClusterer {
    oracle: Arc<dyn SettingOracle>,
    max_comparisons: Option<usize>,
}

impl SettingClusterer {
    /// `max_comparisons` caps oracle calls per frame; `None` scans the
    /// whole history.
    pub fn new(oracle: Arc<dyn SettingOracle>, max_comparisons: Option<usize>) -> Self {
        Self {
            oracle,
            max_comparisons,
        }
    }

    pub fn cluster(&self, timeline: &PersonTimeline) -> PersonClusters {
        let person_id = timeline.person_id;
        let entries = &timeline.entries;
        let mut result = PersonClusters {
            person_id,
            setting_ids: Vec::with_capacity(entries.len()),
            oracle_calls: 0,
            oracle_failures: 0,
        };
        let mut next_index: u32 = 0;

        for i in 0..entries.len() {
            let setting_id = match self.scan_back(person_id, entries, i, &mut result) {
                Some(j) => result.setting_ids[j],
                None => {
                    let id = SettingId::new(person_id, next_index);
                    next_index += 1;
                    id
                }
            };
            result.setting_ids.push(setting_id);
        }

        result
    }

    /// Index of the closest earlier entry in the same setting as entry `i`.
    fn scan_back(
        &self,
        person_id: u32,
        entries: &[TimelineEntry],
        i: usize,
        result: &mut PersonClusters,
    ) -> Option<usize> {
        let current = &entries[i].frame_path;
        let mut comparisons = 0usize;

        for j in (0..i).rev() {
            if self.max_comparisons.is_some_and(|budget| comparisons >= budget) {
                log::debug!(
                    "Comparison budget exhausted for person {person_id} at {}",
                    current.display()
                );
                break;
            }
            comparisons += 1;
            result.oracle_calls += 1;
            if self.ask(person_id, current, &entries[j].frame_path, result) {
                return Some(j);
            }
        }
        None
    }

    fn ask(&self, person_id: u32, frame: &Path, other: &Path, result: &mut PersonClusters) -> bool {
        match self.oracle.same_setting(frame, other) {
            Ok(same) => {
                log::debug!(
                    "Person {person_id}: {} vs {} -> {same}",
                    frame.display(),
                    other.display()
                );
                same
            }
            Err(e) => {
                result.oracle_failures += 1;
                log::warn!(
                    "Setting comparison failed for person {person_id} ({} vs {}): {e}; treating as different",
                    frame.display(),
                    other.display()
                );
                false
            }
        }
    }
}
