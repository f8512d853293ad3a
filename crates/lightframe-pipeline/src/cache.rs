// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared image cache: the single current artifact plus per-category tallies.
//
// One mutex guards both the artifact reference and the counters. The
// superseded artifact is dropped, and subscribers are called, only after that
// mutex is released, so a subscriber may read the cache from its callback.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lightframe_core::types::{Artifact, ArtifactId, CategoryKey};
use tokio::sync::Notify;
use tokio::sync::futures::Notified;
use tracing::{debug, error, info, warn};

/// Handle returned by [`ImageCache::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn() + Send + Sync>;

/// Copy of the current buffer, taken from the artifact referenced under the
/// cache lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferCopy {
    pub bytes: Vec<u8>,
    pub source_path: Option<PathBuf>,
}

struct CacheState {
    current: Arc<Artifact>,
    counters: HashMap<CategoryKey, u64>,
}

/// Latest processed capture, shared between the transform pipeline and its
/// consumers.
///
/// Build one per process with [`ImageCache::new`] and hand out
/// `Arc<ImageCache>` clones.
pub struct ImageCache {
    state: Mutex<CacheState>,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
    next_subscription: AtomicU64,
    updated: Notify,
}

impl ImageCache {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CacheState {
                current: Arc::new(Artifact::empty()),
                counters: HashMap::new(),
            }),
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            updated: Notify::new(),
        }
    }

    // -- Reads ----------------------------------------------------------------

    /// The current artifact, or an empty placeholder before the first replace.
    pub fn current(&self) -> Arc<Artifact> {
        Arc::clone(&self.lock_state().current)
    }

    /// Snapshot of the per-category tallies.
    pub fn counters(&self) -> HashMap<CategoryKey, u64> {
        self.lock_state().counters.clone()
    }

    /// Number of replaces that produced a valid category key.
    pub fn total_count(&self) -> u64 {
        self.lock_state().counters.values().sum()
    }

    /// Byte-for-byte copy of the current buffer and its source path.
    ///
    /// Only the artifact reference is read under the lock; artifacts are
    /// immutable, so the copy itself happens after release.
    pub fn copy_bytes(&self) -> BufferCopy {
        let current = self.current();
        BufferCopy {
            bytes: current.bytes().to_vec(),
            source_path: current.source_path().map(Path::to_path_buf),
        }
    }

    /// Future that completes on the next replace. Call `enable()` on it
    /// before re-checking the cache to avoid missing an update in between.
    pub fn notified(&self) -> Notified<'_> {
        self.updated.notified()
    }

    // -- Writes ---------------------------------------------------------------

    /// Install `artifact` as the current one and tally its category.
    ///
    /// A category key that cannot be derived is logged and skipped; the swap
    /// still happens. Returns the id of the artifact that was replaced.
    pub fn replace(&self, artifact: Artifact) -> ArtifactId {
        let incoming = Arc::new(artifact);
        let new_id = incoming.id();

        let (previous, key_result) = {
            let mut state = self.lock_state();
            let previous = std::mem::replace(&mut state.current, incoming);
            let key_result = CategoryKey::from_metadata(state.current.metadata());
            if let Ok(key) = &key_result {
                *state.counters.entry(key.clone()).or_insert(0) += 1;
            }
            (previous, key_result)
        };

        let previous_id = previous.id();
        drop(previous);

        match key_result {
            Ok(key) => info!(artifact = %new_id, category = %key, "Cached artifact replaced"),
            Err(e) => warn!(
                artifact = %new_id,
                error = %e,
                "artifact cached without category tally"
            ),
        }

        // Subscribers run first so a woken waiter sees their effects.
        self.fan_out();
        self.updated.notify_waiters();
        previous_id
    }

    // -- Subscriptions --------------------------------------------------------

    /// Register a callback fired after every successful replace. Callbacks
    /// carry no payload; re-read the cache from inside them if needed.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.lock_subscribers().push((id, Arc::new(callback)));
        debug!(subscription = id.0, "subscriber registered");
        id
    }

    /// Remove a callback. Returns `false` if `id` was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock_subscribers();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    fn fan_out(&self) {
        let subscribers: Vec<(SubscriptionId, Subscriber)> = self.lock_subscribers().clone();
        for (id, callback) in subscribers {
            if panic::catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
                error!(subscription = id.0, "artifact subscriber panicked");
            }
        }
    }

    // -- Locking --------------------------------------------------------------

    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Subscriber)>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("ImageCache")
            .field("current", &state.current.id())
            .field("bytes", &state.current.len())
            .field("categories", &state.counters.len())
            .finish()
    }
}
