//! Notification relay — at-most-one visible status message per
//! logical operation.
//!
//! A reconciliation poll makes many attempts, but the operator must
//! see a single lifecycle: one dismissible "in progress" message that
//! is replaced (never stacked) on repeat, then exactly one terminal
//! message — success, "still processing", or error. Backend-generated
//! notifications pass through with display-level dedup by id; the
//! relay never mutates them server-side.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::models::Notification;

// ═══════════════════════════════════════════════════════════
// Toast types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    InProgress,
    Success,
    /// Poll budget exhausted while the backend keeps processing.
    /// Non-blocking and informational — not a failure.
    StillProcessing,
    Error,
}

/// A status message for the presentation layer, keyed by operation id.
#[derive(Debug, Clone)]
pub struct Toast {
    pub operation_id: String,
    pub kind: ToastKind,
    pub message: String,
}

/// Terminal outcome of a logical operation.
#[derive(Debug, Clone)]
pub enum OperationOutcome {
    Success(String),
    StillProcessing(String),
    Error(String),
}

impl OperationOutcome {
    fn kind(&self) -> ToastKind {
        match self {
            Self::Success(_) => ToastKind::Success,
            Self::StillProcessing(_) => ToastKind::StillProcessing,
            Self::Error(_) => ToastKind::Error,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Success(m) | Self::StillProcessing(m) | Self::Error(m) => m,
        }
    }
}

/// Generate a fresh operation id.
pub fn new_operation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ═══════════════════════════════════════════════════════════
// Relay
// ═══════════════════════════════════════════════════════════

type StatusCallback = Box<dyn Fn(&Toast) + Send + Sync>;

struct OperationEntry {
    title: String,
    terminal: bool,
}

/// Maps poller/coordinator outcomes to operator-visible messages.
#[derive(Default)]
pub struct NotificationRelay {
    operations: Mutex<HashMap<String, OperationEntry>>,
    subscribers: Mutex<Vec<StatusCallback>>,
    watchers: Mutex<HashMap<String, Vec<StatusCallback>>>,
    seen_backend_ids: Mutex<HashSet<String>>,
}

impl NotificationRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every status toast the relay emits.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&Toast) + Send + Sync + 'static,
    {
        self.subscribers.lock().unwrap().push(Box::new(callback));
    }

    /// Subscribe to one operation's toasts. Watchers are dropped once
    /// the operation reaches its terminal message.
    pub fn on_operation_status<F>(&self, operation_id: &str, callback: F)
    where
        F: Fn(&Toast) + Send + Sync + 'static,
    {
        self.watchers
            .lock()
            .unwrap()
            .entry(operation_id.to_string())
            .or_default()
            .push(Box::new(callback));
    }

    /// Open (or re-open) the single in-progress message for an
    /// operation. A repeated begin with the same id replaces the
    /// existing message rather than stacking a second one.
    pub fn begin_operation(&self, operation_id: &str, title: &str) {
        {
            let mut ops = self.operations.lock().unwrap();
            ops.insert(
                operation_id.to_string(),
                OperationEntry {
                    title: title.to_string(),
                    terminal: false,
                },
            );
        }
        self.emit(Toast {
            operation_id: operation_id.to_string(),
            kind: ToastKind::InProgress,
            message: title.to_string(),
        });
    }

    /// Dismiss the in-progress message and emit the one terminal
    /// message. Returns false (and emits nothing) when the operation
    /// is unknown or already terminal — the single-terminal invariant
    /// holds no matter how many poll attempts or resolves occur.
    pub fn resolve_operation(&self, operation_id: &str, outcome: OperationOutcome) -> bool {
        {
            let mut ops = self.operations.lock().unwrap();
            match ops.get_mut(operation_id) {
                None => {
                    tracing::debug!(operation_id, "Resolve for unknown operation ignored");
                    return false;
                }
                Some(entry) if entry.terminal => {
                    tracing::debug!(operation_id, "Duplicate terminal resolve ignored");
                    return false;
                }
                Some(entry) => entry.terminal = true,
            }
        }

        let toast = Toast {
            operation_id: operation_id.to_string(),
            kind: outcome.kind(),
            message: outcome.message().to_string(),
        };
        self.emit(toast);
        self.watchers.lock().unwrap().remove(operation_id);
        true
    }

    /// Relay a backend notification, deduplicating display by id.
    /// First presentation wins; re-relay of a seen id is a no-op.
    pub fn relay_backend(&self, notification: &Notification) -> bool {
        if !self
            .seen_backend_ids
            .lock()
            .unwrap()
            .insert(notification.id.clone())
        {
            return false;
        }
        self.emit(Toast {
            operation_id: notification.id.clone(),
            kind: ToastKind::InProgress,
            message: format!("{}: {}", notification.title, notification.message),
        });
        true
    }

    /// Operations begun and not yet terminal.
    pub fn active_operations(&self) -> usize {
        self.operations
            .lock()
            .unwrap()
            .values()
            .filter(|e| !e.terminal)
            .count()
    }

    /// Title of the in-progress message for an operation, if any.
    pub fn in_progress_title(&self, operation_id: &str) -> Option<String> {
        self.operations
            .lock()
            .unwrap()
            .get(operation_id)
            .filter(|e| !e.terminal)
            .map(|e| e.title.clone())
    }

    fn emit(&self, toast: Toast) {
        if let Some(listeners) = self.watchers.lock().unwrap().get(&toast.operation_id) {
            for listener in listeners {
                listener(&toast);
            }
        }
        for subscriber in self.subscribers.lock().unwrap().iter() {
            subscriber(&toast);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::Urgency;

    fn collecting_relay() -> (Arc<NotificationRelay>, Arc<Mutex<Vec<Toast>>>) {
        let relay = Arc::new(NotificationRelay::new());
        let toasts = Arc::new(Mutex::new(Vec::new()));
        let sink = toasts.clone();
        relay.subscribe(move |t| sink.lock().unwrap().push(t.clone()));
        (relay, toasts)
    }

    fn terminal_count(toasts: &[Toast], id: &str) -> usize {
        toasts
            .iter()
            .filter(|t| t.operation_id == id && t.kind != ToastKind::InProgress)
            .count()
    }

    #[test]
    fn begin_then_resolve_emits_one_terminal() {
        let (relay, toasts) = collecting_relay();

        relay.begin_operation("op-1", "Approving document");
        relay.resolve_operation("op-1", OperationOutcome::Success("Document approved".into()));

        let toasts = toasts.lock().unwrap();
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[0].kind, ToastKind::InProgress);
        assert_eq!(toasts[1].kind, ToastKind::Success);
        assert_eq!(terminal_count(&toasts, "op-1"), 1);
    }

    #[test]
    fn duplicate_resolves_are_ignored() {
        let (relay, toasts) = collecting_relay();

        relay.begin_operation("op-1", "Rejecting document");
        assert!(relay.resolve_operation("op-1", OperationOutcome::Error("Backend error".into())));
        assert!(!relay.resolve_operation("op-1", OperationOutcome::Success("too late".into())));
        assert!(!relay.resolve_operation(
            "op-1",
            OperationOutcome::StillProcessing("also too late".into())
        ));

        assert_eq!(terminal_count(&toasts.lock().unwrap(), "op-1"), 1);
    }

    #[test]
    fn resolve_without_begin_is_ignored() {
        let (relay, toasts) = collecting_relay();
        assert!(!relay.resolve_operation("ghost", OperationOutcome::Success("?".into())));
        assert!(toasts.lock().unwrap().is_empty());
    }

    #[test]
    fn repeated_begin_replaces_not_stacks() {
        let (relay, _toasts) = collecting_relay();

        relay.begin_operation("op-1", "Uploading passport");
        relay.begin_operation("op-1", "Uploading passport (retry)");

        assert_eq!(relay.active_operations(), 1);
        assert_eq!(
            relay.in_progress_title("op-1").as_deref(),
            Some("Uploading passport (retry)")
        );
    }

    #[test]
    fn still_processing_is_a_distinct_terminal_kind() {
        let (relay, toasts) = collecting_relay();

        relay.begin_operation("op-1", "Approving document");
        relay.resolve_operation(
            "op-1",
            OperationOutcome::StillProcessing("Accepted, still processing".into()),
        );

        let toasts = toasts.lock().unwrap();
        assert_eq!(toasts[1].kind, ToastKind::StillProcessing);
        assert_ne!(toasts[1].kind, ToastKind::Error);
    }

    #[test]
    fn per_operation_watcher_sees_only_its_operation() {
        let relay = NotificationRelay::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        relay.on_operation_status("op-1", move |t| sink.lock().unwrap().push(t.clone()));

        relay.begin_operation("op-1", "Mine");
        relay.begin_operation("op-2", "Someone else's");
        relay.resolve_operation("op-2", OperationOutcome::Success("done".into()));
        relay.resolve_operation("op-1", OperationOutcome::Success("done".into()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|t| t.operation_id == "op-1"));
    }

    #[test]
    fn watcher_dropped_after_terminal() {
        let relay = NotificationRelay::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        relay.on_operation_status("op-1", move |t| sink.lock().unwrap().push(t.clone()));

        relay.begin_operation("op-1", "First run");
        relay.resolve_operation("op-1", OperationOutcome::Success("done".into()));
        // A later lifecycle reusing the id is a new logical operation;
        // the old watcher must not fire again.
        relay.begin_operation("op-1", "Second run");

        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn backend_notifications_dedup_by_id() {
        let (relay, toasts) = collecting_relay();
        let n = Notification {
            id: "n-1".into(),
            kind: "document_classified".into(),
            title: "Classification complete".into(),
            message: "Passport classified as identification".into(),
            urgency: Urgency::Normal,
            read: false,
            document_id: Some("doc-1".into()),
            client_id: None,
        };

        assert!(relay.relay_backend(&n));
        assert!(!relay.relay_backend(&n));
        assert_eq!(toasts.lock().unwrap().len(), 1);
    }

    #[test]
    fn operation_ids_are_unique() {
        assert_ne!(new_operation_id(), new_operation_id());
    }
}
