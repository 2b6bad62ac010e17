//! In-process mutual exclusion keyed by entity id.
//!
//! Every mutation of a split (its shares, payments, interest, reminders) runs
//! under `split:<id>`, every append to a score chain under `score:<user>`.
//! When both are needed the split lock is taken first and score locks follow
//! in ascending user order.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum LockKey {
    Split(String),
    Score(String),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Split(id) => write!(f, "split:{id}"),
            Self::Score(user) => write!(f, "score:{user}"),
        }
    }
}

/// Held lock; released on drop.
pub(crate) struct EntityGuard {
    _guard: OwnedMutexGuard<()>,
}

#[derive(Debug, Default)]
pub(crate) struct EntityLocks {
    inner: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    pub(crate) async fn lock(&self, key: LockKey) -> EntityGuard {
        let slot = {
            // A poisoned registry only means another task panicked while
            // inserting; the map itself is still consistent.
            let mut map = self
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            // Entries referenced only by the map are idle.
            map.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(map.entry(key).or_default())
        };
        EntityGuard {
            _guard: slot.lock_owned().await,
        }
    }

    /// Locks every key in ascending order.
    pub(crate) async fn lock_all(&self, mut keys: Vec<LockKey>) -> Vec<EntityGuard> {
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = Arc::new(EntityLocks::default());
        let counter = Arc::new(AsyncMutex::new(Vec::new()));

        let first = locks.lock(LockKey::Split("s1".to_string())).await;

        let task = {
            let locks = Arc::clone(&locks);
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let _guard = locks.lock(LockKey::Split("s1".to_string())).await;
                counter.lock().await.push("second");
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        counter.lock().await.push("first");
        drop(first);
        task.await.unwrap();

        assert_eq!(*counter.lock().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = EntityLocks::default();
        let _a = locks.lock(LockKey::Split("s1".to_string())).await;
        let _b = locks.lock(LockKey::Score("alice".to_string())).await;
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = EntityLocks::default();
        drop(locks.lock(LockKey::Split("s1".to_string())).await);
        let _b = locks.lock(LockKey::Split("s2".to_string())).await;
        assert_eq!(locks.len(), 1);
    }
}
