//! Import run accounting.

use crate::error::ImportError;
use crate::import::batcher::BatcherStats;
use crate::import::worker::BatchOutcome;
use serde::Serialize;

/// Counters for one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Rows decoded from the input file
    pub rows: usize,
    /// Name fields seen across all rows, duplicates included
    pub names_read: usize,
    /// Fields dropped because the name was already scheduled
    pub duplicates_skipped: usize,
    /// Batches handed to the worker pool
    pub batches_dispatched: usize,
    pub batches_inserted: usize,
    pub batches_failed: usize,
    pub workers_started: usize,
    /// Authors in successfully inserted batches
    pub authors_inserted: usize,
}

impl ImportStats {
    /// Merge another ImportStats into this one by summing all counts.
    ///
    /// Used to total several runs, e.g. one per input file.
    pub fn merge(&mut self, other: &ImportStats) {
        self.rows += other.rows;
        self.names_read += other.names_read;
        self.duplicates_skipped += other.duplicates_skipped;
        self.batches_dispatched += other.batches_dispatched;
        self.batches_inserted += other.batches_inserted;
        self.batches_failed += other.batches_failed;
        self.workers_started += other.workers_started;
        self.authors_inserted += other.authors_inserted;
    }

    pub(crate) fn absorb_batcher(&mut self, batcher: BatcherStats, dispatched: usize) {
        self.rows = batcher.rows;
        self.names_read = batcher.names_read;
        self.duplicates_skipped = batcher.duplicates_skipped;
        self.batches_dispatched = dispatched;
    }
}

/// Result of one import run: what was inserted plus the first failure.
///
/// Later failures are logged and counted in `stats.batches_failed` but never
/// replace `error`.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub stats: ImportStats,
    /// Inserted names in completion order
    pub names: Vec<String>,
    pub error: Option<ImportError>,
}

impl ImportReport {
    /// Report for a run that aborted before the pipeline started.
    pub fn failed(error: ImportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn inserted_count(&self) -> usize {
        self.stats.authors_inserted
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Fold one worker outcome into the report. Only the aggregator calls
    /// this, so the first-error slot has a single writer.
    pub(crate) fn record(&mut self, outcome: BatchOutcome) {
        match outcome {
            BatchOutcome::Inserted { batch, .. } => {
                self.stats.batches_inserted += 1;
                self.stats.authors_inserted += batch.len();
                self.names.extend(batch.into_names());
            }
            BatchOutcome::Failed {
                worker,
                size,
                error,
            } => {
                self.stats.batches_failed += 1;
                log::trace!("worker {} lost {} authors", worker, size);
                self.record_error(error);
            }
        }
    }

    pub(crate) fn record_error(&mut self, error: ImportError) {
        if let Some(first) = &self.error {
            log::warn!("additional import failure after '{}': {}", first, error);
            return;
        }
        self.error = Some(error);
    }

    pub fn into_result(self) -> Result<ImportStats, ImportError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::batcher::Batch;
    use crate::models::Author;
    use crate::store::StoreError;

    fn batch(seq: usize, names: &[&str]) -> Batch {
        Batch {
            seq,
            authors: names.iter().map(|name| Author::new(*name)).collect(),
        }
    }

    fn failure(seq: usize, message: &str) -> BatchOutcome {
        BatchOutcome::Failed {
            worker: 0,
            size: 1,
            error: ImportError::Store {
                batch: seq,
                source: StoreError::Rejected(message.to_string()),
            },
        }
    }

    #[test]
    fn first_error_is_kept() {
        let mut report = ImportReport::default();
        report.record(BatchOutcome::Inserted {
            worker: 1,
            batch: batch(0, &["Ada", "Grace"]),
        });
        report.record(failure(1, "first"));
        report.record(failure(2, "second"));

        assert_eq!(report.inserted_count(), 2);
        assert_eq!(report.names, vec!["Ada".to_string(), "Grace".to_string()]);
        assert_eq!(report.stats.batches_failed, 2);
        let error = report.error.expect("error recorded");
        assert!(error.to_string().contains("first"));
    }

    #[test]
    fn into_result_prefers_error() {
        let report = ImportReport::failed(ImportError::Cancelled);
        assert!(matches!(report.into_result(), Err(ImportError::Cancelled)));

        let report = ImportReport::default();
        assert_eq!(report.into_result().expect("ok"), ImportStats::default());
    }

    #[test]
    fn merge_sums_counts() {
        let mut total = ImportStats {
            rows: 1,
            authors_inserted: 2,
            ..ImportStats::default()
        };
        total.merge(&ImportStats {
            rows: 3,
            authors_inserted: 4,
            batches_failed: 1,
            ..ImportStats::default()
        });

        assert_eq!(total.rows, 4);
        assert_eq!(total.authors_inserted, 6);
        assert_eq!(total.batches_failed, 1);
    }
}
