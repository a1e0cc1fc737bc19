//! Row-scoped batching of deduplicated author names.
//!
//! Batch boundaries reset with every row while the dedup set spans the whole
//! file. A batch therefore never mixes names from two rows: it is flushed when
//! it reaches `batch_size` accepted names, and whatever remains is flushed at
//! the row's last field. Do not turn this into cross-row batching; a file of
//! one-name rows intentionally yields one single-author batch per row.

use crate::import::dedup::Deduplicator;
use crate::models::Author;

/// Bounded group of authors handed to exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position in dispatch order, starting at 0.
    pub seq: usize,
    pub authors: Vec<Author>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    pub fn into_names(self) -> impl Iterator<Item = String> {
        self.authors.into_iter().map(|author| author.name)
    }
}

/// Counters kept by the batcher for the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatcherStats {
    pub rows: usize,
    pub names_read: usize,
    pub duplicates_skipped: usize,
    pub batches: usize,
}

pub struct Batcher {
    batch_size: usize,
    dedup: Deduplicator,
    current: Vec<Author>,
    stats: BatcherStats,
}

impl Batcher {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            dedup: Deduplicator::new(),
            current: Vec::new(),
            stats: BatcherStats::default(),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn stats(&self) -> BatcherStats {
        self.stats
    }

    /// Feed one row of raw name fields, returning the batches it completed
    /// in dispatch order. Empty batches are never returned.
    pub fn process<S: AsRef<str>>(&mut self, row: &[S]) -> Vec<Batch> {
        self.stats.rows += 1;

        let mut completed = Vec::new();
        let last = row.len().saturating_sub(1);

        for (index, field) in row.iter().enumerate() {
            let name = field.as_ref();
            self.stats.names_read += 1;

            if self.dedup.should_add(name) {
                self.current.push(Author::new(name));
            } else {
                self.stats.duplicates_skipped += 1;
            }

            if self.current.len() == self.batch_size || index == last {
                if let Some(batch) = self.flush() {
                    completed.push(batch);
                }
            }
        }

        completed
    }

    fn flush(&mut self) -> Option<Batch> {
        if self.current.is_empty() {
            return None;
        }

        let authors = std::mem::replace(&mut self.current, Vec::with_capacity(self.batch_size));
        let batch = Batch {
            seq: self.stats.batches,
            authors,
        };
        self.stats.batches += 1;
        Some(batch)
    }
}
