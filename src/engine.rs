//! Review engine — the facade the presentation layer consumes.
//!
//! Wires the pieces together for each operator action: validate via
//! the coordinator, open a single in-progress message in the relay,
//! submit the transition request, then reconcile by polling
//! authoritative state until the expected transition is observed (or
//! the budget runs out). On timeout the resource stays in its
//! last-observed state — the engine never assumes success and never
//! rolls back.

use std::sync::{Arc, RwLock};

use crate::backend::{BackendClient, DocumentRequests, DocumentUpload};
use crate::completeness::{compute_completeness, Completeness};
use crate::coordinator::{ActionError, PendingAction, ReviewActionCoordinator};
use crate::models::{Document, DocumentState, FlowState, RejectReason};
use crate::poller::{start_polling_with, PollConfig, PollHandle, PollOutcome};
use crate::relay::{new_operation_id, NotificationRelay, OperationOutcome};
use crate::snapshot_cache::{ClientSnapshot, SnapshotCache};

// ═══════════════════════════════════════════════════════════
// Public surface types
// ═══════════════════════════════════════════════════════════

/// A review action as submitted by the presentation layer.
#[derive(Debug, Clone)]
pub enum ReviewAction {
    Approve {
        client_id: String,
        document_id: String,
        comment: String,
    },
    Reject {
        client_id: String,
        document_id: String,
        comment: String,
        reason: Option<RejectReason>,
    },
    Escalate {
        client_id: String,
        comment: String,
    },
}

impl ReviewAction {
    fn client_id(&self) -> &str {
        match self {
            Self::Approve { client_id, .. }
            | Self::Reject { client_id, .. }
            | Self::Escalate { client_id, .. } => client_id,
        }
    }

    fn title(&self) -> String {
        match self {
            Self::Approve { document_id, .. } => format!("Approving document {document_id}"),
            Self::Reject { document_id, .. } => format!("Rejecting document {document_id}"),
            Self::Escalate { client_id, .. } => format!("Escalating client {client_id}"),
        }
    }
}

/// An accepted action: the operation id keyed into the relay plus the
/// handle for the reconciliation poll now in flight.
#[derive(Debug)]
pub struct SubmittedAction {
    pub operation_id: String,
    pub pending: PendingAction,
    pub handle: PollHandle<ClientSnapshot>,
}

// ═══════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════

/// Session-scoped engine instance. Cheap to share: hand out clones of
/// the `Arc` wrapping it.
pub struct ReviewEngine {
    backend: Arc<dyn BackendClient>,
    coordinator: ReviewActionCoordinator,
    relay: Arc<NotificationRelay>,
    cache: Arc<RwLock<SnapshotCache>>,
    poll_config: PollConfig,
}

impl ReviewEngine {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self::with_poll_config(backend, PollConfig::default())
    }

    pub fn with_poll_config(backend: Arc<dyn BackendClient>, poll_config: PollConfig) -> Self {
        Self {
            coordinator: ReviewActionCoordinator::new(backend.clone()),
            backend,
            relay: Arc::new(NotificationRelay::new()),
            cache: Arc::new(RwLock::new(SnapshotCache::new())),
            poll_config,
        }
    }

    pub fn relay(&self) -> &Arc<NotificationRelay> {
        &self.relay
    }

    // ── Completeness (pull-based) ────────────────────────────

    /// Fetch fresh state for a client, refresh the snapshot cache,
    /// and recompute completeness on demand.
    pub async fn observe_completeness(&self, client_id: &str) -> Result<Completeness, ActionError> {
        let snapshot = self.fetch_snapshot(client_id).await?;
        let completeness = compute_completeness(
            &snapshot.documents,
            snapshot.flow.required_documents_count,
        );
        self.cache
            .write()
            .expect("snapshot cache lock poisoned")
            .store(client_id, snapshot);
        Ok(completeness)
    }

    /// Outstanding document requests for a client, with per-type
    /// counts. Always fetched fresh; requests are not cached.
    pub async fn document_requests(&self, client_id: &str) -> Result<DocumentRequests, ActionError> {
        Ok(self.backend.fetch_document_requests(client_id).await?)
    }

    /// Last cached snapshot for a client, if any. Display only —
    /// reconciliation always re-fetches.
    pub fn cached_snapshot(&self, client_id: &str) -> Option<ClientSnapshot> {
        self.cache
            .read()
            .expect("snapshot cache lock poisoned")
            .get(client_id)
            .cloned()
    }

    // ── Review actions ───────────────────────────────────────

    /// Validate and submit a review action, then reconcile.
    ///
    /// Validation failures surface immediately and leave no trace in
    /// the relay. An accepted action opens exactly one in-progress
    /// message and will produce exactly one terminal message.
    pub async fn submit_review_action(
        &self,
        action: ReviewAction,
    ) -> Result<SubmittedAction, ActionError> {
        let client_id = action.client_id().to_string();

        let pending = match &action {
            ReviewAction::Approve {
                document_id,
                comment,
                ..
            } => {
                let document = self.fetch_document(&client_id, document_id).await?;
                self.coordinator.approve(&document, comment).await?
            }
            ReviewAction::Reject {
                document_id,
                comment,
                reason,
                ..
            } => {
                let document = self.fetch_document(&client_id, document_id).await?;
                self.coordinator.reject(&document, comment, *reason).await?
            }
            ReviewAction::Escalate { comment, .. } => {
                self.coordinator.send_to_supervisor(&client_id, comment).await?
            }
        };

        // The cached view is now behind the backend's accepted intent.
        self.cache
            .write()
            .expect("snapshot cache lock poisoned")
            .invalidate(&client_id);

        let operation_id = new_operation_id();
        self.relay.begin_operation(&operation_id, &action.title());

        let predicate = reconciliation_predicate(&pending);
        let handle = self.start_reconciliation(&operation_id, &client_id, predicate);

        Ok(SubmittedAction {
            operation_id,
            pending,
            handle,
        })
    }

    // ── Uploads ──────────────────────────────────────────────

    /// Upload a file and reconcile until the backend's pipeline makes
    /// it visible. A `parent_document_id` in the upload means "new
    /// version of that document", which re-opens review.
    pub async fn upload_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<SubmittedAction, ActionError> {
        let client_id = upload.client_id.clone();
        let parent_id = upload.parent_document_id.clone();

        // For a re-upload, observe the current version before
        // submitting so the poll can wait for it to advance.
        let prior_version = match &parent_id {
            Some(parent) => self.fetch_document(&client_id, parent).await?.current_version,
            None => 0,
        };

        let document_id = self.backend.upload_document(upload).await?;
        tracing::info!(client_id, document_id, "Upload accepted");

        {
            let mut cache = self.cache.write().expect("snapshot cache lock poisoned");
            cache.invalidate(&client_id);
            if let Some(parent) = &parent_id {
                cache.invalidate_document(parent);
            }
        }

        let operation_id = new_operation_id();
        self.relay
            .begin_operation(&operation_id, &format!("Uploading document {document_id}"));

        // New documents start at version 1, so "version advanced past
        // what we saw before submitting" covers both cases.
        let target_id = parent_id.unwrap_or_else(|| document_id.clone());
        let predicate = move |snapshot: &ClientSnapshot| {
            snapshot
                .documents
                .iter()
                .any(|d| d.id == target_id && d.current_version > prior_version)
        };
        let handle = self.start_reconciliation(&operation_id, &client_id, predicate);

        Ok(SubmittedAction {
            operation_id,
            pending: PendingAction {
                kind: crate::coordinator::ReviewActionKind::Upload,
                subject_id: document_id.clone(),
                client_id: client_id.clone(),
                expected_state: Some(DocumentState::PendingReview),
            },
            handle,
        })
    }

    // ── Preview URLs ─────────────────────────────────────────

    pub fn cache_preview_url(&self, document_id: &str, url: String) {
        self.cache
            .write()
            .expect("snapshot cache lock poisoned")
            .store_preview_url(document_id, url);
    }

    pub fn preview_url(&self, document_id: &str) -> Option<String> {
        self.cache
            .read()
            .expect("snapshot cache lock poisoned")
            .preview_url(document_id)
            .map(str::to_string)
    }

    // ── Internals ────────────────────────────────────────────

    async fn fetch_snapshot(&self, client_id: &str) -> Result<ClientSnapshot, ActionError> {
        let documents = self.backend.fetch_client_documents(client_id).await?;
        let flow = self.backend.fetch_flow_instance(client_id).await?;
        Ok(ClientSnapshot::new(documents, flow))
    }

    async fn fetch_document(
        &self,
        client_id: &str,
        document_id: &str,
    ) -> Result<Document, ActionError> {
        let documents = self.backend.fetch_client_documents(client_id).await?;
        documents
            .into_iter()
            .find(|d| d.id == document_id)
            .ok_or_else(|| {
                ActionError::Precondition(format!(
                    "Document {document_id} not found for client {client_id}"
                ))
            })
    }

    fn start_reconciliation<P>(
        &self,
        operation_id: &str,
        client_id: &str,
        predicate: P,
    ) -> PollHandle<ClientSnapshot>
    where
        P: Fn(&ClientSnapshot) -> bool + Send + 'static,
    {
        let backend = self.backend.clone();
        let fetch_client = client_id.to_string();
        let fetch = move || {
            let backend = backend.clone();
            let client_id = fetch_client.clone();
            async move {
                let documents = backend.fetch_client_documents(&client_id).await?;
                let flow = backend.fetch_flow_instance(&client_id).await?;
                Ok(ClientSnapshot::new(documents, flow))
            }
        };

        let relay = self.relay.clone();
        let cache = self.cache.clone();
        let op_id = operation_id.to_string();
        let cache_client = client_id.to_string();
        let on_terminal = move |outcome: &PollOutcome<ClientSnapshot>| {
            let message = match outcome {
                PollOutcome::Resolved(snapshot) => {
                    cache
                        .write()
                        .expect("snapshot cache lock poisoned")
                        .store(&cache_client, snapshot.clone());
                    OperationOutcome::Success("Action confirmed by the backend".into())
                }
                PollOutcome::TimedOut => OperationOutcome::StillProcessing(
                    "Accepted — the backend is still processing. Refresh later.".into(),
                ),
                PollOutcome::Failed(e) => OperationOutcome::Error(e.to_string()),
                // Structurally unreachable: the poller suppresses the
                // terminal callback on cancellation.
                PollOutcome::Cancelled => return,
            };
            relay.resolve_operation(&op_id, message);
        };

        start_polling_with(fetch, predicate, self.poll_config, on_terminal)
    }
}

/// Predicate observing the transition a pending action expects,
/// evaluated only against freshly fetched snapshots.
fn reconciliation_predicate(pending: &PendingAction) -> impl Fn(&ClientSnapshot) -> bool {
    let subject_id = pending.subject_id.clone();
    let expected_state = pending.expected_state;
    move |snapshot: &ClientSnapshot| match expected_state {
        Some(state) => snapshot
            .documents
            .iter()
            .any(|d| d.id == subject_id && d.state == state),
        // Escalation: the flow instance leaves in_progress.
        None => snapshot.flow.state == FlowState::AwaitingSupervisor,
    }
}
