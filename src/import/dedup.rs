//! Run-scoped name deduplication.

use std::collections::HashSet;

/// Names already scheduled for insertion during one import run.
///
/// Owned by the producer task alone, so it needs no locking. A fresh set is
/// created per run and dropped with it.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `name` the first time it is offered,
    /// `false` on every later occurrence.
    pub fn should_add(&mut self, name: &str) -> bool {
        if self.seen.contains(name) {
            return false;
        }
        self.seen.insert(name.to_owned())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.should_add("Ada"));
        assert!(dedup.should_add("Grace"));
        assert!(!dedup.should_add("Ada"));
        assert!(!dedup.should_add("Ada"));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn names_are_compared_exactly() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.should_add("ada"));
        assert!(dedup.should_add("Ada"));
        assert!(dedup.should_add(" Ada"));
        assert!(dedup.should_add(""));
        assert!(!dedup.should_add(""));
    }
}
