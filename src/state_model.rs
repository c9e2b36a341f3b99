//! Legal state transitions for documents and client KYC flows.
//!
//! Single source of truth for which transitions may be requested.
//! The edge set is deliberately closed: anything not matched below is
//! illegal, and callers must not apply any mutation when a check
//! fails. `published` is terminal for display purposes only — a
//! published document can always be re-opened to `rejected`, so no
//! state is structurally terminal.

use thiserror::Error;

use crate::models::{DocumentState, FlowState};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Illegal document transition: {from} -> {to}")]
    InvalidDocumentTransition { from: DocumentState, to: DocumentState },

    #[error("Illegal flow transition: {from} -> {to}")]
    InvalidFlowTransition { from: FlowState, to: FlowState },
}

// ═══════════════════════════════════════════════════════════
// Document lifecycle
// ═══════════════════════════════════════════════════════════

/// Whether a document may move from `from` to `to`.
///
/// `draft -> published` is illegal: `pending_review` is a mandatory
/// gate. `rejected -> published` is likewise illegal — a rejected
/// document must be resubmitted for review first.
pub fn can_transition(from: DocumentState, to: DocumentState) -> bool {
    use DocumentState::*;
    matches!(
        (from, to),
        (Draft, PendingReview)
            | (PendingReview, Published)
            | (PendingReview, Rejected)
            | (Rejected, PendingReview)
            | (Published, Rejected)
    )
}

/// Checked form of [`can_transition`].
pub fn check_transition(from: DocumentState, to: DocumentState) -> Result<(), TransitionError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(TransitionError::InvalidDocumentTransition { from, to })
    }
}

/// Whether a document state is terminal for display purposes.
///
/// Only `published` qualifies, and even it keeps a legal outbound
/// edge to `rejected` (post-hoc correction).
pub fn is_display_terminal(state: DocumentState) -> bool {
    state == DocumentState::Published
}

// ═══════════════════════════════════════════════════════════
// Client flow
// ═══════════════════════════════════════════════════════════

/// Whether a client flow may move from `from` to `to`.
///
/// `returned` is backend-reported only: it is a valid current state
/// but no inbound edge can be requested from this side.
pub fn can_flow_transition(from: FlowState, to: FlowState) -> bool {
    use FlowState::*;
    matches!(
        (from, to),
        (InProgress, AwaitingSupervisor)
            | (AwaitingSupervisor, Approved)
            | (AwaitingSupervisor, InProgress)
    )
}

/// Checked form of [`can_flow_transition`].
pub fn check_flow_transition(from: FlowState, to: FlowState) -> Result<(), TransitionError> {
    if can_flow_transition(from, to) {
        Ok(())
    } else {
        Err(TransitionError::InvalidFlowTransition { from, to })
    }
}
