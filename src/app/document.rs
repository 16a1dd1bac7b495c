use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity of a document for the lifetime of the store (and across
/// restarts, via the persisted snapshot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: FileId,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub created_at: i64,
}

impl Document {
    pub fn new_untitled(id: FileId) -> Self {
        Self {
            id,
            name: "Untitled".to_string(),
            content: String::new(),
            created_at: unix_timestamp(),
        }
    }
}

/// Current Unix timestamp in seconds
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
