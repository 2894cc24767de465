//! Per-user event queues
//!
//! Each user gets a worker task that handles that user's events one at a
//! time, in arrival order. Different users run concurrently. A worker whose
//! queue stays empty for [`WORKER_IDLE_TIMEOUT`] exits and is replaced on the
//! user's next event.

use super::Orchestrator;
use crate::session::Event;
use crate::transport::{ChatTransport, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Events a user may have queued behind an in-flight generation
const QUEUE_CAPACITY: usize = 32;
const WORKER_IDLE_TIMEOUT: Duration = Duration::from_secs(600);

struct Worker {
    event_tx: mpsc::Sender<Event>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Exited and has nothing left to run
    fn is_done(&self) -> bool {
        self.event_tx.is_closed() && self.handle.is_finished()
    }
}

pub struct Dispatcher<T: ChatTransport + 'static> {
    orchestrator: Arc<Orchestrator<T>>,
    workers: Mutex<HashMap<UserId, Worker>>,
}

impl<T: ChatTransport + 'static> Dispatcher<T> {
    pub fn new(orchestrator: Arc<Orchestrator<T>>) -> Self {
        Self {
            orchestrator,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Queue `event` for `user`. Never waits on another user's work.
    pub async fn dispatch(&self, user: UserId, event: Event) {
        let mut workers = self.workers.lock().await;

        let Some(worker) = workers.get(&user) else {
            self.start_worker(&mut workers, user, event, None);
            return;
        };

        match worker.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                drop(workers);
                tracing::warn!(
                    user_id = %user,
                    event = event.name(),
                    "User queue full, dropping event"
                );
                self.orchestrator.notify_busy(user).await;
            }
            Err(TrySendError::Closed(event)) => {
                // Went idle; it may still be finishing events queued before it closed
                let previous = workers.remove(&user).map(|w| w.handle);
                self.start_worker(&mut workers, user, event, previous);
            }
        }
    }

    fn start_worker(
        &self,
        workers: &mut HashMap<UserId, Worker>,
        user: UserId,
        event: Event,
        previous: Option<JoinHandle<()>>,
    ) {
        workers.retain(|_, worker| !worker.is_done());

        let worker = self.spawn_worker(user, previous);
        // Fresh channel with free capacity
        if worker.event_tx.try_send(event).is_err() {
            tracing::error!(user_id = %user, "Failed to queue event on new worker");
        }
        workers.insert(user, worker);
    }

    fn spawn_worker(&self, user: UserId, previous: Option<JoinHandle<()>>) -> Worker {
        let (event_tx, mut event_rx) = mpsc::channel(QUEUE_CAPACITY);
        let orchestrator = Arc::clone(&self.orchestrator);

        let handle = tokio::spawn(async move {
            // The previous worker's events come first
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    tracing::error!(user_id = %user, error = %e, "Session worker panicked");
                }
            }

            tracing::debug!(user_id = %user, "Session worker started");
            loop {
                match tokio::time::timeout(WORKER_IDLE_TIMEOUT, event_rx.recv()).await {
                    Ok(Some(event)) => orchestrator.handle(user, event).await,
                    Ok(None) => break,
                    Err(_) => {
                        event_rx.close();
                        while let Some(event) = event_rx.recv().await {
                            orchestrator.handle(user, event).await;
                        }
                        tracing::debug!(user_id = %user, "Session worker idle");
                        break;
                    }
                }
            }
            tracing::debug!(user_id = %user, "Session worker stopped");
        });

        Worker { event_tx, handle }
    }

    #[cfg(test)]
    async fn worker_count(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// Stop accepting events, let every worker drain its queue, and wait for them.
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self
            .workers
            .lock()
            .await
            .drain()
            .map(|(_, worker)| worker)
            .collect();
        let count = workers.len();

        for Worker { event_tx, handle } in workers {
            drop(event_tx);
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Session worker panicked");
            }
        }

        tracing::info!(
            workers = count,
            sessions = self.orchestrator.sessions().len().await,
            cached_results = self.orchestrator.cache().len().await,
            "Dispatcher stopped"
        );
    }
}
