//! Reconciliation poller — bounded re-fetch until an expected
//! transition is observed.
//!
//! After a mutating action (upload, approve, reject) the backend's
//! AI-driven pipeline applies the effect at an unknown later time and
//! there is no push channel. The poller bridges the gap: it re-fetches
//! authoritative state at a fixed interval and evaluates a predicate
//! against each *freshly fetched* snapshot — never against locally
//! cached or optimistic data, which is the correctness rule that keeps
//! a poll from "succeeding" on stale local state.
//!
//! State machine: Idle -> Polling -> {Resolved, TimedOut, Failed}.
//! Attempts are strictly sequential: attempt N+1 is scheduled only
//! after attempt N's fetch resolves, so terminal outcomes can never
//! race each other. A timeout is not an error — it means "accepted,
//! still processing".

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::backend::BackendError;

/// Default wait between attempts: 2 seconds.
const DEFAULT_INTERVAL_MS: u64 = 2000;

/// Default attempt bound: 10 (≈20 s worst-case wait at the default interval).
const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Monotonic generation counter across all polls in the process.
/// Each poll's generation keys its log lines and stale-response
/// discarding, instead of closures sharing mutable flags.
static POLL_GENERATION: AtomicU64 = AtomicU64::new(1);

// ═══════════════════════════════════════════════════════════
// Config & outcome
// ═══════════════════════════════════════════════════════════

/// Per-call polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Terminal result of one poll.
#[derive(Debug)]
pub enum PollOutcome<S> {
    /// Predicate observed true; carries the final fetched snapshot.
    Resolved(S),
    /// Attempt bound reached without the predicate turning true.
    /// Informational, not a failure: the backend is still processing
    /// and the resource stays in its last-observed state.
    TimedOut,
    /// A fetch itself failed. Distinct from [`PollOutcome::TimedOut`];
    /// retrying is the caller's explicit choice, never automatic.
    Failed(BackendError),
    /// The initiator cancelled. Only the initiator observes this;
    /// a cancelled poll emits no terminal notification.
    Cancelled,
}

impl<S> PollOutcome<S> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

// ═══════════════════════════════════════════════════════════
// PollHandle
// ═══════════════════════════════════════════════════════════

/// Handle to one in-flight poll.
///
/// Carries its own attempt counter and generation number, so
/// cancellation and stale-response discarding are structural
/// properties of the handle rather than shared mutable state.
#[derive(Debug)]
pub struct PollHandle<S> {
    cancelled: Arc<AtomicBool>,
    attempts: Arc<AtomicU32>,
    generation: u64,
    outcome_rx: oneshot::Receiver<PollOutcome<S>>,
}

impl<S> PollHandle<S> {
    /// Stop the poll. Idempotent; calling after resolution is a no-op.
    /// An in-flight fetch is discarded on return rather than acted on.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Fetch attempts performed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Await the terminal outcome.
    pub async fn outcome(self) -> PollOutcome<S> {
        self.outcome_rx.await.unwrap_or(PollOutcome::Cancelled)
    }
}

// ═══════════════════════════════════════════════════════════
// Polling
// ═══════════════════════════════════════════════════════════

/// Start polling with a terminal callback.
///
/// The first check runs only after one full `interval` (never eagerly
/// at time zero — the backend gets a minimum processing window).
/// `on_terminal` fires exactly once for `Resolved` / `TimedOut` /
/// `Failed`, and never for a cancelled poll.
pub fn start_polling_with<S, F, Fut, P, T>(
    fetch: F,
    predicate: P,
    config: PollConfig,
    on_terminal: T,
) -> PollHandle<S>
where
    S: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<S, BackendError>> + Send,
    P: Fn(&S) -> bool + Send + 'static,
    T: FnOnce(&PollOutcome<S>) + Send + 'static,
{
    let generation = POLL_GENERATION.fetch_add(1, Ordering::Relaxed);
    let cancelled = Arc::new(AtomicBool::new(false));
    let attempts = Arc::new(AtomicU32::new(0));
    let (tx, rx) = oneshot::channel();

    let flag = cancelled.clone();
    let counter = attempts.clone();
    tokio::spawn(async move {
        let outcome = poll_loop(fetch, predicate, config, generation, &flag, &counter).await;
        if matches!(outcome, PollOutcome::Cancelled) {
            tracing::debug!(generation, "Poll cancelled; suppressing outcome");
            return;
        }
        on_terminal(&outcome);
        // Receiver may have been dropped; outcome already delivered
        // via the callback, so a send failure is fine.
        let _ = tx.send(outcome);
    });

    PollHandle {
        cancelled,
        attempts,
        generation,
        outcome_rx: rx,
    }
}

/// Start polling without a terminal callback.
pub fn start_polling<S, F, Fut, P>(fetch: F, predicate: P, config: PollConfig) -> PollHandle<S>
where
    S: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<S, BackendError>> + Send,
    P: Fn(&S) -> bool + Send + 'static,
{
    start_polling_with(fetch, predicate, config, |_| {})
}

async fn poll_loop<S, F, Fut, P>(
    fetch: F,
    predicate: P,
    config: PollConfig,
    generation: u64,
    cancelled: &AtomicBool,
    attempts: &AtomicU32,
) -> PollOutcome<S>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<S, BackendError>>,
    P: Fn(&S) -> bool,
{
    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.interval).await;

        if cancelled.load(Ordering::Relaxed) {
            return PollOutcome::Cancelled;
        }

        attempts.fetch_add(1, Ordering::Relaxed);
        let result = fetch().await;

        // Stale-response guard: a fetch that was in flight when the
        // initiator cancelled must be discarded, not acted on.
        if cancelled.load(Ordering::Relaxed) {
            return PollOutcome::Cancelled;
        }

        match result {
            Err(e) => {
                tracing::warn!(generation, attempt, error = %e, "Poll fetch failed");
                return PollOutcome::Failed(e);
            }
            Ok(snapshot) => {
                if predicate(&snapshot) {
                    tracing::debug!(generation, attempt, "Poll resolved");
                    return PollOutcome::Resolved(snapshot);
                }
                tracing::trace!(generation, attempt, "Poll attempt: not yet ready");
            }
        }
    }

    tracing::debug!(
        generation,
        max_attempts = config.max_attempts,
        "Poll timed out; backend still processing"
    );
    PollOutcome::TimedOut
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn fast(max_attempts: u32) -> PollConfig {
        PollConfig::new(Duration::from_millis(10), max_attempts)
    }

    /// Scripted fetch: returns canned results in order, counting calls.
    struct ScriptedFetch {
        calls: AtomicU32,
        script: Mutex<Vec<Result<u32, BackendError>>>,
    }

    impl ScriptedFetch {
        fn new(script: Vec<Result<u32, BackendError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                script: Mutex::new(script),
            })
        }

        fn next(&self) -> Result<u32, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                Ok(0)
            } else {
                script.remove(0)
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_on_first_ready_snapshot() {
        let fetch = ScriptedFetch::new(vec![Ok(0), Ok(0), Ok(7)]);
        let f = fetch.clone();
        let handle = start_polling(
            move || {
                let f = f.clone();
                async move { f.next() }
            },
            |snapshot: &u32| *snapshot == 7,
            fast(10),
        );

        match handle.outcome().await {
            PollOutcome::Resolved(snapshot) => assert_eq!(snapshot, 7),
            other => panic!("Expected Resolved, got {other:?}"),
        }
        assert_eq!(fetch.calls(), 3, "Must stop fetching once resolved");
    }

    #[tokio::test(start_paused = true)]
    async fn first_check_waits_one_full_interval() {
        let fetch = ScriptedFetch::new(vec![Ok(1)]);
        let f = fetch.clone();
        let started = tokio::time::Instant::now();
        let first_fetch_at = Arc::new(Mutex::new(None));
        let stamp = first_fetch_at.clone();

        let handle = start_polling(
            move || {
                let f = f.clone();
                let stamp = stamp.clone();
                async move {
                    stamp.lock().unwrap().get_or_insert(tokio::time::Instant::now());
                    f.next()
                }
            },
            |_: &u32| true,
            PollConfig::new(Duration::from_millis(2000), 10),
        );

        assert!(handle.outcome().await.is_resolved());
        let at = first_fetch_at.lock().unwrap().unwrap();
        assert!(
            at - started >= Duration::from_millis(2000),
            "First check must not run eagerly at time zero"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_exact_attempt_bound() {
        let fetch = ScriptedFetch::new(vec![]);
        let f = fetch.clone();
        let handle = start_polling(
            move || {
                let f = f.clone();
                async move { f.next() }
            },
            |_: &u32| false,
            fast(3),
        );

        let attempts = handle.attempts.clone();
        match handle.outcome().await {
            PollOutcome::TimedOut => {}
            other => panic!("Expected TimedOut, got {other:?}"),
        }
        assert_eq!(fetch.calls(), 3, "Exactly max_attempts fetches");
        assert_eq!(attempts.load(Ordering::Relaxed), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_fails_immediately_without_retry() {
        let fetch = ScriptedFetch::new(vec![
            Ok(0),
            Err(BackendError::Connection("http://kyc.test".into())),
        ]);
        let f = fetch.clone();
        let handle = start_polling(
            move || {
                let f = f.clone();
                async move { f.next() }
            },
            |_: &u32| false,
            fast(10),
        );

        match handle.outcome().await {
            PollOutcome::Failed(BackendError::Connection(url)) => {
                assert_eq!(url, "http://kyc.test");
            }
            other => panic!("Expected Failed(Connection), got {other:?}"),
        }
        assert_eq!(fetch.calls(), 2, "No further attempts after a fetch error");
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_never_overlap() {
        // A sequentially-scheduled poller can never observe a fetch
        // already in progress when a new one starts.
        let in_flight = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));
        let fetch = ScriptedFetch::new(vec![]);
        let f = fetch.clone();
        let flight = in_flight.clone();
        let seen = overlapped.clone();

        let handle = start_polling(
            move || {
                let f = f.clone();
                let flight = flight.clone();
                let seen = seen.clone();
                async move {
                    if flight.swap(true, Ordering::SeqCst) {
                        seen.store(true, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    flight.store(false, Ordering::SeqCst);
                    f.next()
                }
            },
            |_: &u32| false,
            fast(4),
        );

        handle.outcome().await;
        assert!(!overlapped.load(Ordering::SeqCst), "Attempts must be sequential");
    }

    #[tokio::test]
    async fn cancel_during_inflight_fetch_discards_result() {
        // Fetch blocks until the test releases it; the test cancels
        // while the fetch is in flight, so the (predicate-true) result
        // must be discarded and no terminal callback fired.
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let terminal_calls = Arc::new(AtomicU32::new(0));

        let enter = entered.clone();
        let gate = release.clone();
        let terminals = terminal_calls.clone();
        let handle = start_polling_with(
            move || {
                let enter = enter.clone();
                let gate = gate.clone();
                async move {
                    enter.notify_one();
                    gate.notified().await;
                    Ok::<u32, BackendError>(42)
                }
            },
            |_: &u32| true,
            PollConfig::new(Duration::from_millis(1), 5),
            move |_| {
                terminals.fetch_add(1, Ordering::SeqCst);
            },
        );

        entered.notified().await;
        handle.cancel();
        release.notify_one();

        match handle.outcome().await {
            PollOutcome::Cancelled => {}
            other => panic!("Expected Cancelled, got {other:?}"),
        }
        // Give the task a beat to (incorrectly) fire the callback.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(terminal_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_first_attempt_fetches_nothing() {
        let fetch = ScriptedFetch::new(vec![]);
        let f = fetch.clone();
        let handle = start_polling(
            move || {
                let f = f.clone();
                async move { f.next() }
            },
            |_: &u32| true,
            PollConfig::new(Duration::from_millis(2000), 5),
        );

        handle.cancel();
        match handle.outcome().await {
            PollOutcome::Cancelled => {}
            other => panic!("Expected Cancelled, got {other:?}"),
        }
        assert_eq!(fetch.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_idempotent() {
        let fetch = ScriptedFetch::new(vec![Ok(1)]);
        let f = fetch.clone();
        let handle = start_polling(
            move || {
                let f = f.clone();
                async move { f.next() }
            },
            |_: &u32| true,
            fast(5),
        );

        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_callback_fires_exactly_once() {
        let terminal_calls = Arc::new(AtomicU32::new(0));
        let terminals = terminal_calls.clone();
        let fetch = ScriptedFetch::new(vec![]);
        let f = fetch.clone();

        let handle = start_polling_with(
            move || {
                let f = f.clone();
                async move { f.next() }
            },
            |_: &u32| false,
            fast(3),
            move |outcome| {
                assert!(matches!(outcome, PollOutcome::TimedOut));
                terminals.fetch_add(1, Ordering::SeqCst);
            },
        );

        handle.outcome().await;
        assert_eq!(terminal_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn generations_are_unique() {
        let mk = || {
            start_polling(
                || async { Ok::<u32, BackendError>(1) },
                |_: &u32| true,
                fast(1),
            )
        };
        let a = mk();
        let b = mk();
        assert_ne!(a.generation(), b.generation());
    }

    #[test]
    fn default_config_matches_production_budget() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_millis(2000));
        assert_eq!(config.max_attempts, 10);
    }
}
