//! Per-athlete async mutexes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Serializes mutations of one athlete's training data within a process.
///
/// Athletes never contend with each other; each gets its own mutex, created
/// on first use and dropped once nobody holds or awaits it. The guard is not
/// re-entrant: internal helpers that run under an already-held guard must not
/// lock again.
#[derive(Debug, Default)]
pub struct AthleteLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl AthleteLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `athlete_id`.
    pub async fn lock(&self, athlete_id: Uuid) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Only the map references an idle mutex.
            locks.retain(|id, m| *id == athlete_id || Arc::strong_count(m) > 1);
            locks.entry(athlete_id).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Number of athletes with a live mutex.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_athlete_is_serialized() {
        let locks = Arc::new(AthleteLocks::new());
        let athlete = Uuid::new_v4();

        let guard = locks.lock(athlete).await;
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(athlete).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_athletes_do_not_contend() {
        let locks = AthleteLocks::new();
        let _a = locks.lock(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(Uuid::new_v4())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_mutexes_are_pruned() {
        let locks = AthleteLocks::new();
        for _ in 0..100 {
            let _g = locks.lock(Uuid::new_v4()).await;
        }
        assert!(locks.len() <= 1);

        let held = locks.lock(Uuid::new_v4()).await;
        let other = locks.lock(Uuid::new_v4()).await;
        assert_eq!(locks.len(), 2);
        drop(held);
        drop(other);

        let _last = locks.lock(Uuid::new_v4()).await;
        assert_eq!(locks.len(), 1);
    }
}
