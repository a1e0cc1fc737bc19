//! Concurrent author import pipeline.
//!
//! Reads a delimited file of author names and inserts each unique name once,
//! spreading inserts over a fixed pool of workers:
//!
//! 1. **Reading** (`reader`) - Decodes the file into rows of raw name fields
//! 2. **Deduplication** (`dedup`) - Run-scoped set of names already scheduled
//! 3. **Batching** (`batcher`) - Groups accepted names into row-scoped batches
//! 4. **Workers** (`worker`) - Bounded pool draining the dispatch queue into the store
//! 5. **Coordination** (`coordinator`) - Wires the stages and aggregates the result
//! 6. **Statistics** (`stats`) - Run counters and the final report
//!
//! # Architecture
//!
//! One producer task owns the Batcher and its dedup set, so neither needs a
//! lock. Batches travel to the workers over a bounded channel; outcomes come
//! back over a second channel that a single aggregator drains, which makes
//! "first error wins" race free without shared mutable state.
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use author_import::config::ImportConfig;
//! use author_import::import::AuthorImporter;
//! use author_import::store::PgAuthorStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(PgAuthorStore::new(pool));
//! let importer = AuthorImporter::new(store, ImportConfig::from_env());
//!
//! let report = importer.import_from_file("authors.csv").await;
//! println!("Imported {} authors", report.inserted_count());
//! ```

pub mod batcher;
pub mod coordinator;
pub mod dedup;
pub mod reader;
pub mod stats;
pub mod worker;

// Re-export main types
pub use batcher::{Batch, Batcher};
pub use coordinator::AuthorImporter;
pub use dedup::Deduplicator;
pub use stats::{ImportReport, ImportStats};
