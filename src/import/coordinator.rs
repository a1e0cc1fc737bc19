//! Import coordination for author files.
//!
//! The AuthorImporter runs one import end to end:
//! 1. Decode the whole input file (fail fast, before any worker exists)
//! 2. Start the worker pool on a bounded dispatch queue
//! 3. Spawn the producer, the only owner of the Batcher and its dedup set
//! 4. Aggregate worker outcomes until the result queue closes
//! 5. Collect producer and worker exits into the final report

use crate::config::ImportConfig;
use crate::error::ImportError;
use crate::import::batcher::{Batch, Batcher, BatcherStats};
use crate::import::reader;
use crate::import::stats::ImportReport;
use crate::import::worker::{BatchOutcome, WorkerPool};
use crate::store::AuthorStore;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Coordinates bulk author imports against an [`AuthorStore`].
///
/// Store failures are fail-soft: a failed batch stops its worker and becomes
/// the run's error (if it is the first), while the other workers keep
/// draining the queue. Failed batches are not retried.
pub struct AuthorImporter {
    store: Arc<dyn AuthorStore>,
    config: ImportConfig,
    cancel: CancellationToken,
}

impl AuthorImporter {
    pub fn new(store: Arc<dyn AuthorStore>, config: ImportConfig) -> Self {
        Self {
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop enqueueing and taking batches once `token` is cancelled.
    /// Inserts already running are allowed to finish and are counted.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Import every unique name in the delimited file at `path`.
    ///
    /// # Returns
    /// An ImportReport with the number of inserted authors and the first
    /// error any stage observed. Input errors yield a zero count and no
    /// worker is started.
    pub async fn import_from_file(&self, path: impl AsRef<Path>) -> ImportReport {
        let path = path.as_ref();
        log::info!("importing authors from {}", path.display());

        let rows = match reader::read_rows(path, self.config.delimiter).await {
            Ok(rows) => rows,
            Err(err) => {
                log::error!("author import aborted: {}", err);
                return ImportReport::failed(err);
            }
        };

        let workers = self.config.workers.max(1);
        let (batch_tx, batch_rx) = mpsc::channel::<Batch>(workers);
        let (result_tx, mut result_rx) = mpsc::channel::<BatchOutcome>(workers);

        let pool = WorkerPool::spawn(
            workers,
            batch_rx,
            result_tx,
            Arc::clone(&self.store),
            self.config.insert_timeout,
            self.cancel.clone(),
        );

        let producer = tokio::spawn(produce(
            rows,
            self.config.batch_size,
            batch_tx,
            self.cancel.clone(),
        ));

        let mut report = ImportReport::default();
        report.stats.workers_started = pool.size();

        while let Some(outcome) = result_rx.recv().await {
            report.record(outcome);
        }

        let mut cut_short = false;
        match producer.await {
            Ok(summary) => {
                cut_short = summary.cancelled;
                report.stats.absorb_batcher(summary.batcher, summary.dispatched);
            }
            Err(err) => report.record_error(ImportError::WorkerPanicked(err.to_string())),
        }

        for panic in pool.join().await {
            report.record_error(ImportError::WorkerPanicked(panic));
        }

        // A token cancelled after the last batch settled did not change the result.
        let stats = &report.stats;
        let unsettled = stats.batches_dispatched > stats.batches_inserted + stats.batches_failed;
        if cut_short || (self.cancel.is_cancelled() && unsettled) {
            report.record_error(ImportError::Cancelled);
        }

        match &report.error {
            None => log::info!(
                "author import complete: {} inserted, {} duplicates skipped, {} batches",
                report.stats.authors_inserted,
                report.stats.duplicates_skipped,
                report.stats.batches_inserted
            ),
            Some(err) => log::error!(
                "author import finished with errors: {} inserted, {} of {} batches failed: {}",
                report.stats.authors_inserted,
                report.stats.batches_failed,
                report.stats.batches_dispatched,
                err
            ),
        }

        report
    }
}

/// What the producer did before it returned.
#[derive(Debug)]
struct ProducerSummary {
    batcher: BatcherStats,
    /// Batches actually handed to the dispatch queue.
    dispatched: usize,
    /// Rows were left unbatched because the run was cancelled.
    cancelled: bool,
}

/// Producer task: feed rows through the Batcher and hand completed batches
/// to the workers. Dropping `batches` on return closes the dispatch queue.
async fn produce(
    rows: Vec<Vec<String>>,
    batch_size: usize,
    batches: mpsc::Sender<Batch>,
    cancel: CancellationToken,
) -> ProducerSummary {
    let mut batcher = Batcher::new(batch_size);
    let mut dispatched = 0;
    let mut cancelled = false;

    'rows: for row in &rows {
        for batch in batcher.process(row.as_slice()) {
            let sent = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    false
                }
                sent = batches.send(batch) => sent.is_ok(),
            };

            if !sent {
                log::debug!("producer stopping after {} batches", dispatched);
                break 'rows;
            }
            dispatched += 1;
        }
    }

    ProducerSummary {
        batcher: batcher.stats(),
        dispatched,
        cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn producer_stops_when_all_workers_are_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let rows = vec![vec!["a".to_string()], vec!["b".to_string()]];
        let summary = produce(rows, 10, tx, CancellationToken::new()).await;

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.batcher.batches, 1);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn producer_sends_batches_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let rows = vec![
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec!["c".to_string(), "d".to_string(), "e".to_string()],
        ];

        let summary = produce(rows, 2, tx, CancellationToken::new()).await;

        let mut seen = Vec::new();
        while let Some(batch) = rx.recv().await {
            seen.push((batch.seq, batch.len()));
        }

        assert_eq!(summary.dispatched, 3);
        assert_eq!(seen, vec![(0, 2), (1, 1), (2, 2)]);
        assert_eq!(summary.batcher.duplicates_skipped, 1);
        assert!(!summary.cancelled);
    }

    #[tokio::test]
    async fn producer_reports_rows_left_behind_on_cancel() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let rows = vec![vec!["a".to_string()], vec!["b".to_string()]];
        let summary = produce(rows, 10, tx, cancel).await;

        assert_eq!(summary.dispatched, 0);
        assert!(summary.cancelled);
    }
}
