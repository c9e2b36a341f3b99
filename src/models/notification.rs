use serde::{Deserialize, Serialize};

use super::enums::Urgency;

/// Ephemeral backend-generated notification.
///
/// Created by backend events; the engine only relays and deduplicates
/// display of these, never mutates them server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub urgency: Urgency,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}
