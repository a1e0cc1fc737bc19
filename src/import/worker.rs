//! Bounded pool of insert workers.
//!
//! Workers share one dispatch queue and report every batch they finish on a
//! result queue. Each worker holds its own clone of the result sender, so the
//! result queue closes exactly when the last worker exits.

use crate::error::ImportError;
use crate::import::batcher::Batch;
use crate::store::AuthorStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Receiving half of the dispatch queue, shared by all workers.
pub type DispatchQueue = Arc<Mutex<mpsc::Receiver<Batch>>>;

/// What a worker reports for each batch it took off the queue.
#[derive(Debug)]
pub enum BatchOutcome {
    Inserted {
        worker: usize,
        batch: Batch,
    },
    Failed {
        worker: usize,
        size: usize,
        error: ImportError,
    },
}

/// One insert worker. Holds only queue handles and the store; never any of
/// the producer's state.
pub struct InsertWorker {
    id: usize,
    batches: DispatchQueue,
    results: mpsc::Sender<BatchOutcome>,
    store: Arc<dyn AuthorStore>,
    insert_timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl InsertWorker {
    /// Drain the dispatch queue until it closes, the run is cancelled, or an
    /// insert fails. A failure stops this worker only.
    pub async fn run(self) {
        log::trace!("worker {}: started", self.id);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    log::debug!("worker {}: cancelled, not taking further batches", self.id);
                    break;
                }
                next = next_batch(&self.batches) => next,
            };

            let Some(batch) = next else {
                break;
            };

            if batch.is_empty() {
                log::trace!("worker {}: skipping empty batch {}", self.id, batch.seq);
                continue;
            }

            match self.insert(&batch).await {
                Ok(()) => {
                    log::debug!(
                        "worker {}: inserted batch {} ({} authors)",
                        self.id,
                        batch.seq,
                        batch.len()
                    );
                    let outcome = BatchOutcome::Inserted {
                        worker: self.id,
                        batch,
                    };
                    if self.results.send(outcome).await.is_err() {
                        break;
                    }
                }
                Err(error) => {
                    log::error!("worker {}: {}", self.id, error);
                    let outcome = BatchOutcome::Failed {
                        worker: self.id,
                        size: batch.len(),
                        error,
                    };
                    if self.results.send(outcome).await.is_err() {
                        log::warn!(
                            "worker {}: result queue closed, failure of batch {} not reported",
                            self.id,
                            batch.seq
                        );
                    }
                    break;
                }
            }
        }

        log::trace!("worker {}: exiting", self.id);
    }

    async fn insert(&self, batch: &Batch) -> Result<(), ImportError> {
        let insert = self.store.insert_batch(&batch.authors, batch.len());

        let result = match self.insert_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, insert).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ImportError::InsertTimeout {
                        batch: batch.seq,
                        timeout,
                    });
                }
            },
            None => insert.await,
        };

        result.map_err(|source| ImportError::Store {
            batch: batch.seq,
            source,
        })
    }
}

async fn next_batch(batches: &DispatchQueue) -> Option<Batch> {
    let mut receiver = batches.lock().await;
    receiver.recv().await
}

/// Fixed set of [`InsertWorker`] tasks.
pub struct WorkerPool {
    workers: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers on the current runtime.
    ///
    /// `results` is moved in and cloned once per worker; the caller keeps no
    /// sender, so the result receiver sees `None` after every worker exits.
    pub fn spawn(
        size: usize,
        batches: mpsc::Receiver<Batch>,
        results: mpsc::Sender<BatchOutcome>,
        store: Arc<dyn AuthorStore>,
        insert_timeout: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        let size = size.max(1);
        let batches: DispatchQueue = Arc::new(Mutex::new(batches));
        let mut workers = JoinSet::new();

        for id in 0..size {
            let worker = InsertWorker {
                id,
                batches: Arc::clone(&batches),
                results: results.clone(),
                store: Arc::clone(&store),
                insert_timeout,
                cancel: cancel.clone(),
            };
            workers.spawn(worker.run());
        }

        log::debug!("started {} import workers", size);
        Self { workers, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for every worker to exit, returning the messages of any that
    /// panicked.
    pub async fn join(mut self) -> Vec<String> {
        let mut panics = Vec::new();
        while let Some(joined) = self.workers.join_next().await {
            if let Err(err) = joined {
                panics.push(err.to_string());
            }
        }
        panics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Author;
    use crate::test_support::RecordingStore;

    async fn drain(
        pool: WorkerPool,
        mut results: mpsc::Receiver<BatchOutcome>,
    ) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = results.recv().await {
            outcomes.push(outcome);
        }
        assert!(pool.join().await.is_empty(), "no worker panicked");
        outcomes
    }

    #[tokio::test]
    async fn empty_batch_never_reaches_the_store() {
        let store = Arc::new(RecordingStore::new());
        let (batch_tx, batch_rx) = mpsc::channel(4);
        let (result_tx, result_rx) = mpsc::channel(4);

        let pool = WorkerPool::spawn(
            2,
            batch_rx,
            result_tx,
            store.clone(),
            None,
            CancellationToken::new(),
        );

        batch_tx
            .send(Batch {
                seq: 0,
                authors: Vec::new(),
            })
            .await
            .expect("queue open");
        batch_tx
            .send(Batch {
                seq: 1,
                authors: vec![Author::new("Ada")],
            })
            .await
            .expect("queue open");
        drop(batch_tx);

        let outcomes = drain(pool, result_rx).await;

        assert_eq!(store.calls(), 1);
        assert_eq!(store.submitted_names(), vec!["Ada".to_string()]);
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            &outcomes[0],
            BatchOutcome::Inserted { batch, .. } if batch.seq == 1
        ));
    }

    #[tokio::test]
    async fn failing_worker_exits_and_reports_once() {
        let store = Arc::new(RecordingStore::new().failing_on("Mallory"));
        let (batch_tx, batch_rx) = mpsc::channel(4);
        let (result_tx, result_rx) = mpsc::channel(4);

        let pool = WorkerPool::spawn(
            1,
            batch_rx,
            result_tx,
            store.clone(),
            None,
            CancellationToken::new(),
        );

        batch_tx
            .send(Batch {
                seq: 0,
                authors: vec![Author::new("Mallory")],
            })
            .await
            .expect("queue open");
        drop(batch_tx);

        let outcomes = drain(pool, result_rx).await;

        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            &outcomes[0],
            BatchOutcome::Failed { size: 1, error: ImportError::Store { batch: 0, .. }, .. }
        ));
    }
}
