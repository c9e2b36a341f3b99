//! Per-session read-through cache of fetched snapshots.
//!
//! The backend owns every authoritative record; this cache only keeps
//! the most recent fetch per client (plus per-document preview URLs)
//! so screens can render without a round trip. Entries are invalidated
//! by identifier on every explicit refresh and are NEVER consulted by
//! reconciliation predicates — those always observe a fresh fetch.
//! Nothing here survives a session: no persistence, no cross-session
//! sharing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{Document, FlowInstance};

/// One client's most recently fetched state.
#[derive(Debug, Clone)]
pub struct ClientSnapshot {
    pub documents: Vec<Document>,
    pub flow: FlowInstance,
    pub fetched_at: DateTime<Utc>,
}

impl ClientSnapshot {
    pub fn new(documents: Vec<Document>, flow: FlowInstance) -> Self {
        Self {
            documents,
            flow,
            fetched_at: Utc::now(),
        }
    }
}

/// In-memory snapshot + preview-URL cache for one portal session.
#[derive(Default)]
pub struct SnapshotCache {
    snapshots: HashMap<String, ClientSnapshot>,
    preview_urls: HashMap<String, String>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Client snapshots ─────────────────────────────────────

    /// Store the latest fetched snapshot for a client, replacing any
    /// previous one.
    pub fn store(&mut self, client_id: &str, snapshot: ClientSnapshot) {
        self.snapshots.insert(client_id.to_string(), snapshot);
    }

    pub fn get(&self, client_id: &str) -> Option<&ClientSnapshot> {
        self.snapshots.get(client_id)
    }

    /// Drop a client's snapshot and the preview URLs of its documents.
    pub fn invalidate(&mut self, client_id: &str) {
        if let Some(snapshot) = self.snapshots.remove(client_id) {
            for doc in &snapshot.documents {
                self.preview_urls.remove(&doc.id);
            }
        }
    }

    // ── Preview URLs ─────────────────────────────────────────

    /// Cache a signed preview URL for a document.
    pub fn store_preview_url(&mut self, document_id: &str, url: String) {
        self.preview_urls.insert(document_id.to_string(), url);
    }

    pub fn preview_url(&self, document_id: &str) -> Option<&str> {
        self.preview_urls.get(document_id).map(String::as_str)
    }

    /// Drop one document's preview URL (e.g. after a new version
    /// upload makes the signed URL stale).
    pub fn invalidate_document(&mut self, document_id: &str) {
        self.preview_urls.remove(document_id);
    }

    // ── Bookkeeping ──────────────────────────────────────────

    /// Clear everything. Called on session end.
    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.preview_urls.clear();
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
