//! Veridoc — document lifecycle & review reconciliation engine.
//!
//! The headless core of a banking KYC portal. It tracks document and
//! client-flow state, derives completeness aggregates, and reconciles
//! optimistic operator actions (upload, approve, reject, escalate)
//! against an asynchronous AI-driven backend pipeline by bounded
//! polling. All durable state lives in the backend; this crate only
//! validates, relays, and re-fetches.

pub mod backend; // Backend API seam: BackendClient trait + HTTP client
pub mod completeness; // Completeness percentage + bucket aggregation
pub mod config;
pub mod coordinator; // Review action validation + submission
pub mod engine; // Facade consumed by the presentation layer
pub mod models;
pub mod poller; // Bounded reconciliation polling
pub mod relay; // Operator-facing status messages
pub mod snapshot_cache;
pub mod state_model; // Legal transition tables

pub use backend::{BackendClient, BackendError, DocumentUpload, HttpBackend};
pub use completeness::{average_completeness, compute_completeness, Completeness};
pub use coordinator::{ActionError, PendingAction, ReviewActionCoordinator, ReviewActionKind};
pub use engine::{ReviewAction, ReviewEngine, SubmittedAction};
pub use poller::{start_polling, start_polling_with, PollConfig, PollHandle, PollOutcome};
pub use relay::{NotificationRelay, OperationOutcome, Toast, ToastKind};
pub use state_model::{can_flow_transition, can_transition, TransitionError};

use tracing_subscriber::EnvFilter;

/// Initialize tracing for host applications.
///
/// Honors `RUST_LOG`; falls back to the crate default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("Veridoc engine v{}", config::APP_VERSION);
}
