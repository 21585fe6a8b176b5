//! Background task plumbing
//!
//! A bounded owner for the scoring tasks the coordinator spawns, plus
//! the keyed guard that keeps at most one scoring task per search
//! alive at any time.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;

/// Owns spawned scoring tasks so shutdown can drain them.
pub struct BackgroundTasks {
    tasks: Mutex<JoinSet<()>>,
    accepting: AtomicBool,
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(JoinSet::new()),
            accepting: AtomicBool::new(true),
        }
    }

    /// Spawn a task onto the pool. Returns false once shutdown has
    /// begun; the caller is expected to skip the work.
    pub async fn spawn<F>(&self, future: F) -> bool
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        if !self.accepting.load(Ordering::SeqCst) {
            return false;
        }

        let mut tasks = self.tasks.lock().await;
        // Reap finished tasks opportunistically so the set stays small.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(future);
        true
    }

    /// Stop accepting work, wait up to `grace` for in-flight tasks,
    /// then abort whatever is left.
    pub async fn shutdown(&self, grace: Duration) {
        self.accepting.store(false, Ordering::SeqCst);

        let mut tasks = self.tasks.lock().await;

        let drain = async {
            while tasks.join_next().await.is_some() {}
        };

        if tokio::time::timeout(grace, drain).await.is_err() {
            tracing::warn!("Grace period expired, aborting in-flight scoring tasks");
            tasks.abort_all();
            while tasks.join_next().await.is_some() {}
        }
    }
}

/// Keyed mutual exclusion: at most one scoring task per search id.
pub struct ScoreGuard {
    active: Arc<StdMutex<HashSet<i64>>>,
    search_id: i64,
}

impl ScoreGuard {
    /// Try to claim the scoring slot for a search.
    pub fn acquire(active: &Arc<StdMutex<HashSet<i64>>>, search_id: i64) -> Option<Self> {
        let claimed = active.lock().expect("scoring guard poisoned").insert(search_id);
        claimed.then(|| Self {
            active: active.clone(),
            search_id,
        })
    }

    /// Claim the slot, waiting for any in-flight scoring of the same
    /// search to finish first.
    pub async fn acquire_wait(active: &Arc<StdMutex<HashSet<i64>>>, search_id: i64) -> Self {
        loop {
            if let Some(guard) = Self::acquire(active, search_id) {
                return guard;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl Drop for ScoreGuard {
    fn drop(&mut self) {
        self.active
            .lock()
            .expect("scoring guard poisoned")
            .remove(&self.search_id);
    }
}
