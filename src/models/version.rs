use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of one uploaded file revision.
///
/// Owned exclusively by its document; never shared between documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub number: u32,
    pub size_bytes: u64,
    pub mime_type: String,
    pub checksum: String,
    pub created_by: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}
