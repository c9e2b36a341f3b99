use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::FlowState;

/// Per-client KYC progress tracker. One flow instance per client;
/// it aggregates the client's documents by reference, never by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowInstance {
    pub client_id: String,
    pub required_documents_count: u32,
    pub validated_documents_count: u32,
    /// Derived, clamped to [0, 100]. Recomputed locally by the
    /// completeness calculator; the backend's value is display-only.
    pub completeness_percent: u8,
    pub started_at: DateTime<Utc>,
    pub state: FlowState,
}
