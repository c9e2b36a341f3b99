//! Completeness aggregation over a client's document set.
//!
//! Pure functions from a document snapshot to the documentation
//! completeness percentage and per-state buckets. No I/O, no state:
//! identical input always yields identical output, so callers may
//! recompute on every render.

use serde::Serialize;

use crate::models::{Document, DocumentState};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Partition of a document set by current state.
///
/// Invariant: every document lands in exactly one bucket, so the
/// four sizes always sum to the total document count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompletenessBuckets {
    /// `draft` documents not yet submitted for review.
    pub pending: usize,
    /// `pending_review` documents awaiting a reviewer.
    pub in_review: usize,
    /// `published` documents.
    pub completed: usize,
    /// `rejected` documents awaiting resubmission.
    pub rejected: usize,
}

impl CompletenessBuckets {
    pub fn total(&self) -> usize {
        self.pending + self.in_review + self.completed + self.rejected
    }
}

/// Aggregate completeness for one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Completeness {
    /// Rounded percentage of required documents published, in [0, 100].
    pub percent: u8,
    pub buckets: CompletenessBuckets,
}

// ═══════════════════════════════════════════════════════════
// Calculation
// ═══════════════════════════════════════════════════════════

/// Compute a client's documentation completeness.
///
/// `percent = round(100 * published / max(1, required))`, clamped to
/// [0, 100]. Clamping matters: a client may hold more published
/// documents than the nominal required count (optional supplementary
/// documents), and anything above 100% is invalid output.
pub fn compute_completeness(documents: &[Document], required_count: u32) -> Completeness {
    let mut buckets = CompletenessBuckets::default();
    for doc in documents {
        match doc.state {
            DocumentState::Draft => buckets.pending += 1,
            DocumentState::PendingReview => buckets.in_review += 1,
            DocumentState::Published => buckets.completed += 1,
            DocumentState::Rejected => buckets.rejected += 1,
        }
    }

    let required = required_count.max(1) as f64;
    let raw = (100.0 * buckets.completed as f64 / required).round();
    let percent = raw.clamp(0.0, 100.0) as u8;

    Completeness { percent, buckets }
}

/// Portfolio-level average completeness.
///
/// Arithmetic mean of the clamped per-client percentages — not a
/// document-weighted ratio, so clients with many documents cannot
/// skew the portfolio metric. Empty input averages to 0.
pub fn average_completeness(percents: &[u8]) -> f64 {
    if percents.is_empty() {
        return 0.0;
    }
    let sum: u32 = percents.iter().map(|&p| u32::from(p.min(100))).sum();
    f64::from(sum) / percents.len() as f64
}
