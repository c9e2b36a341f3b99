use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{DocumentState, DocumentType};
use super::version::DocumentVersion;
use super::ModelError;

/// One versioned KYC document plus review metadata.
///
/// The authoritative record lives in the backend; instances here are
/// read-through snapshots. `current_version` is monotonically
/// non-decreasing and old versions are immutable history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub doc_type: DocumentType,
    pub current_version: u32,
    pub state: DocumentState,
    /// AI extraction confidence for the current version, 0.0–1.0.
    pub extraction_confidence: f32,
    pub manually_validated: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub client_id: String,
    pub reviewer_id: Option<String>,
    #[serde(default)]
    pub versions: Vec<DocumentVersion>,
}

impl Document {
    /// Record a new version snapshot.
    ///
    /// Rejects any version number below the current one — re-uploads
    /// may repeat the current number (idempotent backend replays) but
    /// never walk it backwards, and previously recorded versions are
    /// never rewritten.
    pub fn record_version(&mut self, version: DocumentVersion) -> Result<(), ModelError> {
        if version.number < self.current_version {
            return Err(ModelError::VersionRegression {
                document_id: self.id.clone(),
                current: self.current_version,
                proposed: version.number,
            });
        }
        if !self.versions.iter().any(|v| v.number == version.number) {
            self.current_version = version.number;
            self.modified_at = version.created_at;
            self.versions.push(version);
        }
        Ok(())
    }
}
