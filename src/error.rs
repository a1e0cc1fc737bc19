use crate::store::StoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of an author import run.
///
/// `Open` and `Decode` abort the run before any worker starts. The remaining
/// variants are recorded per batch and reported alongside the partial count.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: csv_async::Error,
    },
    #[error("batch {batch} insert failed: {source}")]
    Store {
        batch: usize,
        #[source]
        source: StoreError,
    },
    #[error("batch {batch} insert timed out after {timeout:?}")]
    InsertTimeout { batch: usize, timeout: Duration },
    #[error("import cancelled")]
    Cancelled,
    #[error("import worker panicked: {0}")]
    WorkerPanicked(String),
}

impl ImportError {
    /// True for failures raised while reading the input file.
    pub fn is_input_error(&self) -> bool {
        matches!(self, ImportError::Open { .. } | ImportError::Decode { .. })
    }
}
