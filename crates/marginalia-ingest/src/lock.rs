// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user serialization of pipeline runs within one process.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutexes, one per user id.
///
/// Runs for the same user queue behind each other; different users never
/// contend. Entries are dropped once no run holds or waits on them.
#[derive(Debug, Default, Clone)]
pub struct UserLocks {
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

/// Held for the duration of one run. Releases on drop.
#[derive(Debug)]
pub struct UserGuard {
    user_id: String,
    locks: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, user_id: &str) -> UserGuard {
        let mutex = self
            .locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        UserGuard {
            user_id: user_id.to_string(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of users with a live entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for UserGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map and nobody else still references the mutex.
        self.locks
            .remove_if(&self.user_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
