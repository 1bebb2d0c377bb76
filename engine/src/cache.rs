//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! In-memory actor state with write coalescing
//!
//! The cache owns the authoritative [`ProgressionState`] of every active actor. Mutations only
//! touch memory and set the dirty flag; the persistence worker writes dirty actors on the
//! periodic flush, on departure and at shutdown.

use crate::error::StorageResult;
use crate::persistence::PersistenceWorker;
use crate::persistence::worker::{SaveAck, wait_for};
use crate::progression::ProgressionState;
use dashmap::DashMap;
use skillforge_common::ActorId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

/// Shared handle to one actor's state.
///
/// All mutation of a single actor is serialized through this handle's lock. The lock is never
/// held across an await point. Once the actor is evicted the handle is retired and refuses
/// further mutation, so writes go to the reloaded state instead of being lost.
#[derive(Debug, Clone)]
pub struct ActorHandle {
    state: Arc<Mutex<ProgressionState>>,
    retired: Arc<AtomicBool>,
}

impl ActorHandle {
    fn new(state: ProgressionState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            retired: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProgressionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the state
    pub fn read<R>(&self, f: impl FnOnce(&ProgressionState) -> R) -> R {
        f(&self.lock())
    }

    /// Mutate the state atomically with respect to other mutations of the same actor.
    ///
    /// Hands `f` back unapplied if the actor was evicted since this handle was obtained.
    pub fn try_update<R, F>(&self, f: F) -> Result<R, F>
    where
        F: FnOnce(&mut ProgressionState) -> R,
    {
        let mut state = self.lock();
        if self.is_retired() {
            return Err(f);
        }
        Ok(f(&mut state))
    }

    fn update<R>(&self, f: impl FnOnce(&mut ProgressionState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().is_dirty()
    }

    /// Whether the actor was evicted after this handle was obtained
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Snapshot and queue a save if dirty, returning the written revision and acknowledgement.
    ///
    /// The save is queued while the lock is held so saves of one actor reach the worker in
    /// mutation order. A retired handle already queued its final save and never saves again,
    /// since the reloaded state may have moved on.
    fn queue_save(&self, worker: &PersistenceWorker) -> StorageResult<Option<(u64, SaveAck)>> {
        let state = self.lock();
        if self.is_retired() || !state.is_dirty() {
            return Ok(None);
        }
        let ack = worker.enqueue_save(state.snapshot())?;
        Ok(Some((state.revision(), ack)))
    }

    /// Retire the handle, queue its final save and run `detach`, all under the actor lock.
    ///
    /// Returns `None` without saving if another eviction already retired it. `detach` runs even
    /// when the save cannot be queued.
    fn retire(
        &self,
        worker: &PersistenceWorker,
        detach: impl FnOnce(),
    ) -> Option<StorageResult<Option<SaveAck>>> {
        let state = self.lock();
        if self.retired.swap(true, Ordering::AcqRel) {
            return None;
        }
        let queued = if state.is_dirty() {
            worker.enqueue_save(state.snapshot()).map(Some)
        } else {
            Ok(None)
        };
        detach();
        Some(queued)
    }
}

/// Result of a [`ActorStateCache::flush_all`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub saved: usize,
    pub failed: Vec<ActorId>,
}

type Slot = Arc<OnceCell<ActorHandle>>;

/// Concurrent actor-state cache
pub struct ActorStateCache {
    entries: DashMap<ActorId, Slot>,
    worker: Arc<PersistenceWorker>,
    known_skills: Vec<String>,
}

impl ActorStateCache {
    /// Create a cache whose new or loaded states get every skill in `known_skills` initialized
    pub fn new(worker: Arc<PersistenceWorker>, known_skills: Vec<String>) -> Self {
        Self {
            entries: DashMap::new(),
            worker,
            known_skills,
        }
    }

    pub fn worker(&self) -> &Arc<PersistenceWorker> {
        &self.worker
    }

    pub fn known_skills(&self) -> &[String] {
        &self.known_skills
    }

    /// Number of cached actors, including ones still loading
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.entries.contains_key(&actor)
    }

    /// Cached handle, without loading
    pub fn peek(&self, actor: ActorId) -> Option<ActorHandle> {
        self.entries
            .get(&actor)
            .and_then(|slot| slot.get().cloned())
    }

    /// Get an actor's state, loading it (or creating it fresh) on first use.
    ///
    /// Concurrent first calls for the same actor share a single load.
    pub async fn get(&self, actor: ActorId) -> ActorHandle {
        loop {
            let slot = self
                .entries
                .entry(actor)
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone();
            metrics::gauge!("skillforge_cached_actors").set(self.entries.len() as f64);

            let handle = slot
                .get_or_init(|| self.load_or_create(actor))
                .await
                .clone();

            // An eviction that raced the load removed this slot; load again.
            let current = self
                .entries
                .get(&actor)
                .is_some_and(|entry| Arc::ptr_eq(entry.value(), &slot));
            if current && !handle.is_retired() {
                return handle;
            }
            tokio::task::yield_now().await;
        }
    }

    /// Read an actor's state, loading it if needed
    pub async fn read<R>(&self, actor: ActorId, f: impl FnOnce(&ProgressionState) -> R) -> R {
        self.get(actor).await.read(f)
    }

    /// Read an actor's state without caching it. Cached actors are read in place; anyone else
    /// is loaded from the backend and dropped again.
    pub async fn inspect<R>(&self, actor: ActorId, f: impl FnOnce(&ProgressionState) -> R) -> R {
        match self.peek(actor) {
            Some(handle) => handle.read(f),
            None => self.load_or_create(actor).await.read(f),
        }
    }

    /// Mutate an actor's state, loading it if needed.
    ///
    /// A mutation that loses a race with [`evict`](Self::evict) is applied to the reloaded state.
    pub async fn update<R, F>(&self, actor: ActorId, mut f: F) -> R
    where
        F: FnOnce(&mut ProgressionState) -> R,
    {
        loop {
            match self.get(actor).await.try_update(f) {
                Ok(result) => return result,
                Err(unapplied) => f = unapplied,
            }
        }
    }

    async fn load_or_create(&self, actor: ActorId) -> ActorHandle {
        let mut state = match self.worker.load(actor).await {
            Ok(Some(snapshot)) => ProgressionState::from_snapshot(&snapshot),
            Ok(None) => {
                tracing::debug!("No stored progression for {}, starting fresh", actor);
                ProgressionState::new(actor)
            }
            Err(e) => {
                tracing::error!(
                    "Failed to load progression for {}: {}; starting fresh",
                    actor,
                    e
                );
                ProgressionState::new(actor)
            }
        };
        for skill in &self.known_skills {
            state.initialize_skill(skill);
        }
        ActorHandle::new(state)
    }

    /// Write an actor if dirty and wait for the write.
    ///
    /// Returns whether a write happened. The dirty flag is cleared only after the backend
    /// reports success, and only if nothing changed while the write was in flight.
    pub async fn flush_one(&self, actor: ActorId) -> StorageResult<bool> {
        match self.peek(actor) {
            Some(handle) => flush_handle(&self.worker, &handle).await,
            None => Ok(false),
        }
    }

    /// Write every dirty actor. A failure on one actor does not stop the others; failed actors
    /// stay dirty for the next pass.
    pub async fn flush_all(&self) -> FlushReport {
        let started = std::time::Instant::now();
        let handles: Vec<(ActorId, ActorHandle)> = self
            .entries
            .iter()
            .filter_map(|entry| entry.value().get().map(|h| (*entry.key(), h.clone())))
            .collect();

        let mut report = FlushReport::default();
        let mut pending = Vec::new();
        for (actor, handle) in handles {
            match handle.queue_save(&self.worker) {
                Ok(Some((revision, ack))) => pending.push((actor, handle, revision, ack)),
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("Failed to queue save for {}: {}", actor, e);
                    report.failed.push(actor);
                }
            }
        }

        for (actor, handle, revision, ack) in pending {
            match wait_for(ack).await {
                Ok(()) => {
                    handle.update(|state| state.mark_clean(revision));
                    report.saved += 1;
                }
                Err(e) => {
                    tracing::error!("Failed to save progression for {}: {}", actor, e);
                    report.failed.push(actor);
                }
            }
        }

        metrics::histogram!("skillforge_flush_seconds").record(started.elapsed().as_secs_f64());
        if report.saved > 0 || !report.failed.is_empty() {
            tracing::info!(
                "Flush completed: {} saved, {} failed",
                report.saved,
                report.failed.len()
            );
        }
        report
    }

    /// Flush an actor if dirty, then drop it from memory. A later [`get`](Self::get) reloads
    /// from the backend.
    ///
    /// The final save is queued and the entry removed under the actor lock, so no mutation can
    /// slip in after the snapshot and any reload is queued behind the save on the worker. The
    /// actor is removed even if the final write fails; the error is returned.
    pub async fn evict(&self, actor: ActorId) -> StorageResult<()> {
        let Some(slot) = self.entries.get(&actor).map(|entry| entry.value().clone()) else {
            return Ok(());
        };
        let detach = || {
            self.entries
                .remove_if(&actor, |_, current| Arc::ptr_eq(current, &slot));
            metrics::gauge!("skillforge_cached_actors").set(self.entries.len() as f64);
        };

        let Some(handle) = slot.get() else {
            // Still loading, so nothing has been written yet.
            detach();
            return Ok(());
        };
        match handle.retire(&self.worker, detach) {
            Some(Ok(Some(ack))) => wait_for(ack).await,
            Some(Ok(None)) | None => Ok(()),
            Some(Err(e)) => Err(e),
        }
    }

    /// Run [`flush_all`](Self::flush_all) every `period` until the task is aborted
    pub fn spawn_auto_flush(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval_timer = tokio::time::interval_at(start, period);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval_timer.tick().await;
                let report = self.flush_all().await;
                if !report.failed.is_empty() {
                    tracing::warn!(
                        "{} actor(s) could not be saved and will be retried",
                        report.failed.len()
                    );
                }
            }
        });

        tracing::info!("Auto-flush task started (interval: {}s)", period.as_secs());
        task
    }
}

async fn flush_handle(worker: &PersistenceWorker, handle: &ActorHandle) -> StorageResult<bool> {
    let Some((revision, ack)) = handle.queue_save(worker)? else {
        return Ok(false);
    };
    wait_for(ack).await?;
    handle.update(|state| state.mark_clean(revision));
    Ok(true)
}
