use std::thread::JoinHandle;

use crate::pipeline::cluster_executor::ClusterExecutor;
use crate::setting::domain::setting_clusterer::{PersonClusters, PersonTimeline, SettingClusterer};

const DEFAULT_WORKERS: usize = 4;

/// Fans people out over a fixed pool of worker threads.
///
/// Layout: `main → jobs → [worker x N] → results → main`
///
/// Oracle calls dominate the run time and are I/O bound, so a handful of
/// workers overlap them well. Each person's backward scan stays on a
/// single worker.
pub struct ThreadedClusterExecutor {
    workers: usize,
}

impl ThreadedClusterExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedClusterExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

impl ClusterExecutor for ThreadedClusterExecutor {
    fn execute(
        &self,
        clusterer: &SettingClusterer,
        timelines: Vec<PersonTimeline>,
    ) -> Result<Vec<PersonClusters>, Box<dyn std::error::Error>> {
        let expected = timelines.len();
        if expected == 0 {
            return Ok(Vec::new());
        }
        let workers = self.workers.min(expected);

        let (job_tx, job_rx) = crossbeam_channel::unbounded::<PersonTimeline>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<PersonClusters>();

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|_| spawn_worker(clusterer.clone(), job_rx.clone(), result_tx.clone()))
            .collect();
        drop(job_rx);
        drop(result_tx);

        for timeline in timelines {
            if job_tx.send(timeline).is_err() {
                break;
            }
        }
        drop(job_tx);

        let mut results: Vec<PersonClusters> = result_rx.iter().collect();
        join_workers(handles)?;

        if results.len() != expected {
            return Err(format!(
                "clustered {} of {expected} people; a worker stopped early",
                results.len()
            )
            .into());
        }
        results.sort_by_key(|r| r.person_id);
        Ok(results)
    }
}

fn spawn_worker(
    clusterer: SettingClusterer,
    job_rx: crossbeam_channel::Receiver<PersonTimeline>,
    result_tx: crossbeam_channel::Sender<PersonClusters>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        for timeline in job_rx {
            log::debug!(
                "Clustering person {} ({} frames)",
                timeline.person_id,
                timeline.entries.len()
            );
            if result_tx.send(clusterer.cluster(&timeline)).is_err() {
                break;
            }
        }
    })
}

fn join_workers(handles: Vec<JoinHandle<()>>) -> Result<(), Box<dyn std::error::Error>> {
    let panicked = handles
        .into_iter()
        .map(|h| h.join())
        .filter(|r| r.is_err())
        .count();
    if panicked > 0 {
        return Err(format!("{panicked} cluster worker thread(s) panicked").into());
    }
    Ok(())
}
