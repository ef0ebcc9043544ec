use crate::setting::domain::setting_clusterer::{PersonClusters, PersonTimeline, SettingClusterer};

/// Runs the per-person clustering over every timeline.
///
/// Timelines are independent of each other, so implementations may
/// process them concurrently. Each timeline is still scanned sequentially.
/// Results come back sorted by person ID whatever the scheduling was.
pub trait ClusterExecutor: Send {
    fn execute(
        &self,
        clusterer: &SettingClusterer,
        timelines: Vec<PersonTimeline>,
    ) -> Result<Vec<PersonClusters>, Box<dyn std::error::Error>>;
}

/// Clusters people one after another on the calling thread.
pub struct SequentialClusterExecutor;

impl ClusterExecutor for SequentialClusterExecutor {
    fn execute(
        &self,
        clusterer: &SettingClusterer,
        timelines: Vec<PersonTimeline>,
    ) -> Result<Vec<PersonClusters>, Box<dyn std::error::Error>> {
        let mut results: Vec<PersonClusters> =
            timelines.iter().map(|t| clusterer.cluster(t)).collect();
        results.sort_by_key(|r| r.person_id);
        Ok(results)
    }
}
