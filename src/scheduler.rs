// ABOUTME: Bounded FIFO scheduler driving SyncPipeline passes across many users
// ABOUTME: De-duplicates pending enqueues and periodically sweeps for stale or stuck syncs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex, Semaphore};
use uuid::Uuid;

use trailtime_core::constants::{
    DEFAULT_SYNC_BATCH_SIZE, MIN_SYNC_INTERVAL_HOURS, STUCK_SYNC_RECOVERY_HOURS, USERS_PER_BATCH,
};

use crate::store::ActivityStore;
use crate::sync_pipeline::SyncPipeline;

const QUEUE_CAPACITY: usize = 1024;
const SCAN_INTERVAL_SECS: u64 = 15 * 60;

/// Consumes a bounded, de-duplicating queue of user ids with `USERS_PER_BATCH`
/// sync passes running concurrently. Also periodically enqueues users whose
/// last sync has gone stale, and recovers cursors whose `in_progress` lock
/// was abandoned by a worker that crashed mid-pass.
pub struct Scheduler {
    store: Arc<dyn ActivityStore>,
    pipeline: Arc<SyncPipeline>,
    queued: Mutex<HashSet<Uuid>>,
    sender: mpsc::Sender<Uuid>,
    receiver: Mutex<Option<mpsc::Receiver<Uuid>>>,
}

impl Scheduler {
    /// Build a scheduler over `store`, running passes through `pipeline`.
    #[must_use]
    pub fn new(store: Arc<dyn ActivityStore>, pipeline: Arc<SyncPipeline>) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        Self { store, pipeline, queued: Mutex::new(HashSet::new()), sender, receiver: Mutex::new(Some(receiver)) }
    }

    /// Enqueue `user_id` for a sync pass, unless it's already pending.
    pub async fn enqueue(&self, user_id: Uuid) {
        {
            let mut queued = self.queued.lock().await;
            if !queued.insert(user_id) {
                return;
            }
        }
        if self.sender.send(user_id).await.is_err() {
            tracing::error!(%user_id, "sync queue closed, could not enqueue");
        }
    }

    /// Spawn the worker pool plus the periodic scan and crash-recovery tasks.
    /// Call once per process; a second call is a no-op other than a logged warning.
    pub async fn start(self: Arc<Self>) {
        let Some(receiver) = self.receiver.lock().await.take() else {
            tracing::warn!("scheduler already started, ignoring duplicate start() call");
            return;
        };
        let permits = Arc::new(Semaphore::new(USERS_PER_BATCH));

        let workers = Arc::clone(&self);
        tokio::spawn(async move { workers.run_workers(receiver, permits).await });

        let scan = Arc::clone(&self);
        tokio::spawn(async move { scan.run_periodic_scan().await });

        tokio::spawn(async move { self.run_crash_recovery().await });
    }

    async fn run_workers(self: Arc<Self>, mut receiver: mpsc::Receiver<Uuid>, permits: Arc<Semaphore>) {
        while let Some(user_id) = receiver.recv().await {
            {
                let mut queued = self.queued.lock().await;
                queued.remove(&user_id);
            }
            let scheduler = Arc::clone(&self);
            let permits = Arc::clone(&permits);
            tokio::spawn(async move {
                let _permit = permits.acquire().await;
                if let Err(source) = scheduler.pipeline.sync_user(user_id, DEFAULT_SYNC_BATCH_SIZE).await {
                    tracing::error!(%user_id, %source, "sync pass failed");
                }
            });
        }
    }

    async fn run_periodic_scan(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(SCAN_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let stale_after = Utc::now() - chrono::Duration::hours(MIN_SYNC_INTERVAL_HOURS);
            match self.store.users_due_for_sync(stale_after).await {
                Ok(users) => {
                    for user_id in users {
                        self.enqueue(user_id).await;
                    }
                }
                Err(source) => tracing::error!(%source, "periodic sync scan failed"),
            }
        }
    }

    async fn run_crash_recovery(&self) {
        let mut interval = tokio::time::interval(Duration::from_secs(SCAN_INTERVAL_SECS));
        loop {
            interval.tick().await;
            let stuck_before = Utc::now() - chrono::Duration::hours(STUCK_SYNC_RECOVERY_HOURS);
            match self.store.recover_stuck_syncs(stuck_before).await {
                Ok(recovered) => {
                    for user_id in recovered {
                        tracing::warn!(%user_id, "recovered a stuck sync lock");
                    }
                }
                Err(source) => tracing::error!(%source, "crash recovery sweep failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_ignores_a_duplicate_pending_user() -> anyhow::Result<()> {
        let (sender, mut receiver) = mpsc::channel(QUEUE_CAPACITY);
        let queued = Mutex::new(HashSet::new());
        let user_id = Uuid::new_v4();

        async fn enqueue_once(queued: &Mutex<HashSet<Uuid>>, sender: &mpsc::Sender<Uuid>, user_id: Uuid) -> anyhow::Result<()> {
            let mut queued = queued.lock().await;
            if queued.insert(user_id) {
                sender.send(user_id).await?;
            }
            Ok(())
        }

        enqueue_once(&queued, &sender, user_id).await?;
        enqueue_once(&queued, &sender, user_id).await?;
        drop(sender);

        assert_eq!(receiver.recv().await, Some(user_id));
        assert_eq!(receiver.recv().await, None);
        Ok(())
    }
}
