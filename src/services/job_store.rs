use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::analysis::AnalysisResult;
use crate::models::job::{Job, JobStatus};

/// In-process job repository with time-based eviction of finished jobs.
///
/// Each job entry is written only by the task that processes it; API handlers
/// read snapshots. Pending and running jobs are never evicted.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
    retention: Duration,
}

impl JobStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Allocate a new pending job and return its identifier.
    pub async fn create(&self) -> Uuid {
        let id = Uuid::new_v4();
        let mut jobs = self.jobs.write().await;
        jobs.insert(id, Job::new(id));
        record_retained(jobs.len());
        id
    }

    /// Snapshot of a job, if it is still retained.
    pub async fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Move a pending job to running with progress reset to zero.
    pub async fn mark_running(&self, id: Uuid) -> bool {
        self.update(id, |job| {
            if job.status != JobStatus::Pending {
                return false;
            }
            job.status = JobStatus::Running;
            job.progress = 0;
            true
        })
        .await
    }

    /// Raise progress of a running job. Lower values are ignored.
    pub async fn set_progress(&self, id: Uuid, progress: u8) {
        self.update(id, |job| {
            if job.status != JobStatus::Running || progress <= job.progress {
                return false;
            }
            job.progress = progress.min(100);
            true
        })
        .await;
    }

    /// Finalize as completed. Returns `false` if the job was already final.
    pub async fn complete(&self, id: Uuid, result: AnalysisResult) -> bool {
        self.update(id, move |job| {
            if job.status.is_terminal() {
                return false;
            }
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.result = Some(result);
            job.finished_at = Some(Utc::now());
            true
        })
        .await
    }

    /// Finalize as failed, keeping the progress reached so far.
    pub async fn fail(&self, id: Uuid, error: String, trace: Option<String>) -> bool {
        self.update(id, move |job| {
            if job.status.is_terminal() {
                return false;
            }
            job.status = JobStatus::Failed;
            job.error = Some(error);
            job.trace = trace;
            job.finished_at = Some(Utc::now());
            true
        })
        .await
    }

    async fn update<F>(&self, id: Uuid, apply: F) -> bool
    where
        F: FnOnce(&mut Job) -> bool,
    {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            Some(job) => {
                let changed = apply(job);
                if changed {
                    job.updated_at = Utc::now();
                }
                changed
            }
            None => false,
        }
    }

    /// Drop finished jobs older than the retention period. Returns how many were removed.
    pub async fn sweep_expired(&self) -> usize {
        let Some(cutoff) = chrono::Duration::from_std(self.retention)
            .ok()
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
        else {
            return 0;
        };

        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| match job.finished_at {
            Some(finished) if job.status.is_terminal() => finished > cutoff,
            _ => true,
        });
        let removed = before - jobs.len();

        record_retained(jobs.len());
        if removed > 0 {
            debug!(removed, remaining = jobs.len(), "Evicted finished jobs");
        }
        removed
    }

    /// Run [`JobStore::sweep_expired`] periodically on the current runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let store = Arc::clone(self);
        info!(
            interval_secs = every.as_secs(),
            retention_secs = store.retention.as_secs(),
            "Starting job eviction sweeper"
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                store.sweep_expired().await;
            }
        })
    }
}

fn record_retained(count: usize) {
    metrics::gauge!("analysis_jobs_retained").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> AnalysisResult {
        AnalysisResult {
            analysis: "ملخص".to_string(),
            main_topics: 1,
            key_points: 3,
            fallback: false,
            note: String::new(),
            interactive_questions: Vec::new(),
            sources: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_lifecycle_pending_running_completed() {
        let store = JobStore::new(Duration::from_secs(60));
        let id = store.create().await;
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Pending);

        assert!(store.mark_running(id).await);
        store.set_progress(id, 40).await;
        assert_eq!(store.get(id).await.unwrap().progress, 40);

        assert!(store.complete(id, sample_result()).await);
        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_progress_never_decreases() {
        let store = JobStore::new(Duration::from_secs(60));
        let id = store.create().await;
        store.mark_running(id).await;
        store.set_progress(id, 50).await;
        store.set_progress(id, 20).await;
        assert_eq!(store.get(id).await.unwrap().progress, 50);
    }

    #[tokio::test]
    async fn test_finalized_exactly_once() {
        let store = JobStore::new(Duration::from_secs(60));
        let id = store.create().await;
        store.mark_running(id).await;
        store.set_progress(id, 30).await;

        assert!(store.fail(id, "boom".to_string(), None).await);
        assert!(!store.complete(id, sample_result()).await);
        assert!(!store.fail(id, "again".to_string(), None).await);

        let job = store.get(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
        assert_eq!(job.progress, 30);
    }

    #[tokio::test]
    async fn test_sweep_keeps_active_and_fresh_jobs() {
        let store = JobStore::new(Duration::ZERO);
        let pending = store.create().await;
        let running = store.create().await;
        store.mark_running(running).await;
        let done = store.create().await;
        store.mark_running(done).await;
        store.complete(done, sample_result()).await;

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(store.sweep_expired().await, 1);
        assert!(store.get(pending).await.is_some());
        assert!(store.get(running).await.is_some());
        assert!(store.get(done).await.is_none());

        let kept = JobStore::new(Duration::from_secs(3600));
        let id = kept.create().await;
        kept.mark_running(id).await;
        kept.fail(id, "x".to_string(), None).await;
        assert_eq!(kept.sweep_expired().await, 0);
    }

    #[test]
    fn test_retained_gauge_tracks_creation_and_sweep() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(async {
                let store = JobStore::new(Duration::ZERO);
                store.create().await;
                let done = store.create().await;
                store.mark_running(done).await;
                store.complete(done, sample_result()).await;
            })
        });
        assert!(handle.render().contains("analysis_jobs_retained 2"));

        metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(async {
                let store = JobStore::new(Duration::ZERO);
                store.create().await;
                let done = store.create().await;
                store.mark_running(done).await;
                store.complete(done, sample_result()).await;
                tokio::time::sleep(Duration::from_millis(5)).await;
                store.sweep_expired().await;
            })
        });
        assert!(handle.render().contains("analysis_jobs_retained 1"));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let store = JobStore::new(Duration::from_secs(60));
        let id = Uuid::new_v4();
        assert!(store.get(id).await.is_none());
        assert!(!store.mark_running(id).await);
        assert!(store.is_empty().await);
    }
}
