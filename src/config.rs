use std::env;
use std::time::Duration;

/// Names accepted into one batch before it is flushed.
pub const DEFAULT_BATCH_SIZE: usize = 2_000;

/// Concurrent insert workers per import run.
pub const DEFAULT_WORKERS: usize = 20;

pub const DEFAULT_DELIMITER: u8 = b';';

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn env_delimiter(key: &str, default: u8) -> u8 {
    env::var(key)
        .ok()
        .and_then(|value| value.bytes().next())
        .unwrap_or(default)
}

fn env_duration_millis(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|millis| *millis > 0)
        .map(Duration::from_millis)
}

/// Tuning for a single author import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportConfig {
    pub batch_size: usize,
    pub workers: usize,
    pub delimiter: u8,
    /// Deadline for one `insert_batch` call. `None` waits indefinitely.
    pub insert_timeout: Option<Duration>,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self {
            batch_size: env_usize("IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE),
            workers: env_usize("IMPORT_WORKERS", DEFAULT_WORKERS),
            delimiter: env_delimiter("IMPORT_DELIMITER", DEFAULT_DELIMITER),
            insert_timeout: env_duration_millis("IMPORT_INSERT_TIMEOUT_MS"),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_insert_timeout(mut self, timeout: Duration) -> Self {
        self.insert_timeout = Some(timeout);
        self
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            workers: DEFAULT_WORKERS,
            delimiter: DEFAULT_DELIMITER,
            insert_timeout: None,
        }
    }
}

/// Connection settings for the Postgres author store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    /// Reads `DATABASE_URL` and `DATABASE_MAX_CONNECTIONS`. The pool defaults
    /// to one connection per worker so no worker waits on another's connection.
    pub fn from_env(workers: usize) -> Result<Self, env::VarError> {
        let url = env::var("DATABASE_URL")?;
        let max_connections = env_usize("DATABASE_MAX_CONNECTIONS", workers);

        Ok(Self {
            url,
            max_connections: u32::try_from(max_connections).unwrap_or(u32::MAX),
        })
    }
}
