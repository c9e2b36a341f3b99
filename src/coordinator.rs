//! Review action coordinator — validate and issue transition requests.
//!
//! Owns no persistent state and knows nothing about timing: it checks
//! caller input and transition legality against a freshly fetched
//! snapshot, then emits exactly one transition request per call. It
//! never waits for backend confirmation (the poller's job) and never
//! retries (the caller's explicit choice).

use std::sync::Arc;

use thiserror::Error;

use crate::backend::{BackendClient, BackendError};
use crate::models::{Document, DocumentState, FlowState, RejectReason};
use crate::state_model::{check_transition, TransitionError};

#[derive(Error, Debug)]
pub enum ActionError {
    /// Caller-supplied input violates a precondition. Recoverable
    /// locally; surfaced immediately, no transition request issued.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested state change is not legal from the current
    /// state. The UI must refresh state before allowing a retry.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// A business rule is not met. The message names the rule.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// The kind of review action a pending marker refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewActionKind {
    Approve,
    Reject,
    Escalate,
    /// New file or new version submitted; review re-opens.
    Upload,
}

/// Marker for an accepted-but-unconfirmed action. Carries enough
/// context (subject, expected transition) for the poller to reconcile
/// and for the UI to retry without re-deriving anything.
#[derive(Debug, Clone)]
pub struct PendingAction {
    pub kind: ReviewActionKind,
    /// Document id for approve/reject, client id for escalation.
    pub subject_id: String,
    pub client_id: String,
    /// Document state the poller should wait to observe, when the
    /// action targets a document.
    pub expected_state: Option<DocumentState>,
}

/// Validates and submits state-transition intents.
pub struct ReviewActionCoordinator {
    backend: Arc<dyn BackendClient>,
}

impl ReviewActionCoordinator {
    pub fn new(backend: Arc<dyn BackendClient>) -> Self {
        Self { backend }
    }

    /// Approve a document.
    ///
    /// Policy: every approval must be justified in writing, so an
    /// empty comment fails validation before anything is sent.
    /// `document` must be a freshly fetched snapshot — legality is
    /// checked against its state, which is how a `rejected` document
    /// is forced back through the `pending_review` gate instead of
    /// being fast-tracked to `published`.
    pub async fn approve(
        &self,
        document: &Document,
        comment: &str,
    ) -> Result<PendingAction, ActionError> {
        require_comment(comment)?;
        check_transition(document.state, DocumentState::Published)?;

        self.backend
            .submit_approval(&document.id, comment.trim())
            .await?;
        tracing::info!(document_id = %document.id, "Approval submitted");

        Ok(PendingAction {
            kind: ReviewActionKind::Approve,
            subject_id: document.id.clone(),
            client_id: document.client_id.clone(),
            expected_state: Some(DocumentState::Published),
        })
    }

    /// Reject a document with a mandatory comment and reason code.
    pub async fn reject(
        &self,
        document: &Document,
        comment: &str,
        reason: Option<RejectReason>,
    ) -> Result<PendingAction, ActionError> {
        require_comment(comment)?;
        let reason = reason.ok_or_else(|| {
            ActionError::Validation("A rejection reason code is required".into())
        })?;
        check_transition(document.state, DocumentState::Rejected)?;

        self.backend
            .submit_rejection(&document.id, comment.trim(), reason)
            .await?;
        tracing::info!(document_id = %document.id, reason = %reason, "Rejection submitted");

        Ok(PendingAction {
            kind: ReviewActionKind::Reject,
            subject_id: document.id.clone(),
            client_id: document.client_id.clone(),
            expected_state: Some(DocumentState::Rejected),
        })
    }

    /// Escalate a client's dossier to a supervisor.
    ///
    /// Fetches the flow instance fresh and requires it to be
    /// `in_progress` with every required document validated.
    pub async fn send_to_supervisor(
        &self,
        client_id: &str,
        comment: &str,
    ) -> Result<PendingAction, ActionError> {
        require_comment(comment)?;

        let flow = self.backend.fetch_flow_instance(client_id).await?;
        if flow.state != FlowState::InProgress {
            return Err(ActionError::Precondition(format!(
                "Escalation requires the flow to be in_progress (currently {})",
                flow.state
            )));
        }
        if flow.validated_documents_count < flow.required_documents_count {
            return Err(ActionError::Precondition(format!(
                "Escalation requires all required documents validated ({} of {})",
                flow.validated_documents_count, flow.required_documents_count
            )));
        }

        self.backend
            .submit_supervisor_escalation(client_id, comment.trim())
            .await?;
        tracing::info!(client_id, "Supervisor escalation submitted");

        Ok(PendingAction {
            kind: ReviewActionKind::Escalate,
            subject_id: client_id.to_string(),
            client_id: client_id.to_string(),
            expected_state: None,
        })
    }
}

fn require_comment(comment: &str) -> Result<(), ActionError> {
    if comment.trim().is_empty() {
        return Err(ActionError::Validation(
            "A written justification comment is required".into(),
        ));
    }
    Ok(())
}
