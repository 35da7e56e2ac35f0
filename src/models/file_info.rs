use serde::{Deserialize, Serialize};

/// Server-side id of a submitted file, used to address comment threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: i64,
    pub path: String,
}
