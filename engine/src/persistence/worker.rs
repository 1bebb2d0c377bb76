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

//! The single background task that owns the backend
//!
//! Every load, save and close goes through one FIFO channel, so backend calls never overlap
//! and requests for the same actor complete in the order they were sent. Callers that need a
//! write-before-continue guarantee await the acknowledgement returned by the worker.

use crate::error::{StorageError, StorageResult};
use crate::persistence::PersistenceBackend;
use skillforge_common::{ActorId, ProgressionSnapshot};
use std::sync::{Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Acknowledgement for a queued save
pub type SaveAck = oneshot::Receiver<StorageResult<()>>;

enum StoreRequest {
    Load {
        actor: ActorId,
        reply: oneshot::Sender<StorageResult<Option<ProgressionSnapshot>>>,
    },
    Save {
        snapshot: ProgressionSnapshot,
        reply: oneshot::Sender<StorageResult<()>>,
    },
    Close {
        reply: oneshot::Sender<StorageResult<()>>,
    },
}

/// Handle to the persistence task
pub struct PersistenceWorker {
    sender: mpsc::UnboundedSender<StoreRequest>,
    task: Mutex<Option<JoinHandle<()>>>,
    backend_name: &'static str,
}

impl PersistenceWorker {
    /// Move the backend onto a new task and start serving requests
    pub fn spawn(backend: Box<dyn PersistenceBackend>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let backend_name = backend.name();
        let task = tokio::spawn(run(backend, receiver));
        tracing::info!("Persistence worker started ({} backend)", backend_name);
        Self {
            sender,
            task: Mutex::new(Some(task)),
            backend_name,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    pub async fn load(&self, actor: ActorId) -> StorageResult<Option<ProgressionSnapshot>> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Load { actor, reply })
            .map_err(|_| StorageError::WorkerUnavailable)?;
        response.await.map_err(|_| StorageError::WorkerUnavailable)?
    }

    /// Queue a save without waiting. Safe to call while holding a synchronous lock, which is
    /// how callers keep saves for one actor in mutation order.
    pub fn enqueue_save(&self, snapshot: ProgressionSnapshot) -> StorageResult<SaveAck> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Save { snapshot, reply })
            .map_err(|_| StorageError::WorkerUnavailable)?;
        Ok(response)
    }

    /// Queue a save and wait for the backend to finish it
    pub async fn save(&self, snapshot: ProgressionSnapshot) -> StorageResult<()> {
        wait_for(self.enqueue_save(snapshot)?).await
    }

    /// Close the backend after every request queued before this call, then stop the task
    pub async fn close(&self) -> StorageResult<()> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Close { reply })
            .map_err(|_| StorageError::WorkerUnavailable)?;
        let result = response.await.map_err(|_| StorageError::WorkerUnavailable)?;

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Persistence worker task failed: {}", e);
            }
        }
        result
    }
}

/// Wait for a queued save to complete
pub async fn wait_for(ack: SaveAck) -> StorageResult<()> {
    ack.await.map_err(|_| StorageError::WorkerUnavailable)?
}

async fn run(
    backend: Box<dyn PersistenceBackend>,
    mut receiver: mpsc::UnboundedReceiver<StoreRequest>,
) {
    while let Some(request) = receiver.recv().await {
        match request {
            StoreRequest::Load { actor, reply } => {
                metrics::counter!("skillforge_loads_total").increment(1);
                let _ = reply.send(backend.load(actor).await);
            }
            StoreRequest::Save { snapshot, reply } => {
                let result = backend.save(&snapshot).await;
                match &result {
                    Ok(()) => metrics::counter!("skillforge_saves_total").increment(1),
                    Err(e) => {
                        metrics::counter!("skillforge_save_failures_total").increment(1);
                        tracing::debug!("Save for {} failed: {}", snapshot.actor_id, e);
                    }
                }
                let _ = reply.send(result);
            }
            StoreRequest::Close { reply } => {
                let result = backend.close().await;
                match &result {
                    Ok(()) => tracing::info!("Closed {} persistence backend", backend.name()),
                    Err(e) => tracing::error!("Failed to close {} backend: {}", backend.name(), e),
                }
                let _ = reply.send(result);
                break;
            }
        }
    }
    receiver.close();
    tracing::info!("Persistence worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MockPersistenceBackend;
    use skillforge_common::SkillProgress;

    fn snapshot(actor: ActorId, level: u32) -> ProgressionSnapshot {
        let mut snapshot = ProgressionSnapshot::new(actor);
        snapshot.insert("mining", SkillProgress::new(level, 0.0));
        snapshot
    }

    #[tokio::test]
    async fn test_saves_are_applied_in_order() {
        let actor = ActorId::new();
        let mut backend = MockPersistenceBackend::new();
        let mut sequence = mockall::Sequence::new();
        backend.expect_name().return_const("mock");
        for level in 1..=3u32 {
            backend
                .expect_save()
                .withf(move |s| s.get("mining").map(|p| p.level) == Some(level))
                .times(1)
                .in_sequence(&mut sequence)
                .returning(|_| Ok(()));
        }
        backend.expect_close().times(1).returning(|| Ok(()));

        let worker = PersistenceWorker::spawn(Box::new(backend));
        let acks: Vec<_> = (1..=3)
            .map(|level| worker.enqueue_save(snapshot(actor, level)).unwrap())
            .collect();
        for ack in acks {
            wait_for(ack).await.unwrap();
        }
        worker.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_requests_after_close_fail() {
        let mut backend = MockPersistenceBackend::new();
        backend.expect_name().return_const("mock");
        backend.expect_close().times(1).returning(|| Ok(()));

        let worker = PersistenceWorker::spawn(Box::new(backend));
        worker.close().await.unwrap();

        assert!(!worker.is_running());
        assert!(matches!(
            worker.load(ActorId::new()).await,
            Err(StorageError::WorkerUnavailable)
        ));
        assert!(matches!(
            worker.save(snapshot(ActorId::new(), 1)).await,
            Err(StorageError::WorkerUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_errors_are_returned_to_caller() {
        let mut backend = MockPersistenceBackend::new();
        backend.expect_name().return_const("mock");
        backend
            .expect_load()
            .returning(|_| Err(StorageError::WorkerUnavailable));
        backend.expect_close().returning(|| Ok(()));

        let worker = PersistenceWorker::spawn(Box::new(backend));
        assert!(worker.load(ActorId::new()).await.is_err());
        worker.close().await.unwrap();
    }
}
