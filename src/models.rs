use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ===== Author Models =====

/// An author name scheduled for insertion. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Persisted author row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StoredAuthor {
    pub id: i32,
    pub name: String,
}
