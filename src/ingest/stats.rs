//! Ingestion counters shared by all workers and the health endpoint

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use super::coerce::FieldIssue;
use crate::error::ErrorKind;

#[derive(Debug, Default)]
pub struct IngestStats {
    received: AtomicU64,
    stored: AtomicU64,
    duplicates: AtomicU64,
    ignored: AtomicU64,
    defaulted: AtomicU64,
    dropped: AtomicU64,
    decode_errors: AtomicU64,
    type_mismatches: AtomicU64,
    missing_fields: AtomicU64,
    store_failures: AtomicU64,
}

/// Point-in-time copy of the counters.
///
/// `defaulted` and `dropped` count messages; the per-kind counters count
/// occurrences, including attributes defaulted in lenient mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub stored: u64,
    pub duplicates: u64,
    pub ignored: u64,
    pub defaulted: u64,
    pub dropped: u64,
    pub decode_errors: u64,
    pub type_mismatches: u64,
    pub missing_fields: u64,
    pub store_failures: u64,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stored(&self) {
        self.stored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
    }

    /// Message saved with at least one defaulted attribute
    pub fn record_defaulted(&self) {
        self.defaulted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self, kind: ErrorKind) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            ErrorKind::Decode => &self.decode_errors,
            ErrorKind::TypeMismatch => &self.type_mismatches,
            ErrorKind::MissingField => &self.missing_fields,
            ErrorKind::StoreFailure => &self.store_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an attribute that was defaulted but did not fail the message
    pub fn record_issue(&self, issue: &FieldIssue) {
        let counter = match issue {
            FieldIssue::Missing { .. } => &self.missing_fields,
            FieldIssue::TypeMismatch { .. } => &self.type_mismatches,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            stored: self.stored.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            defaulted: self.defaulted.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            type_mismatches: self.type_mismatches.load(Ordering::Relaxed),
            missing_fields: self.missing_fields.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = IngestStats::new();
        stats.record_received();
        stats.record_received();
        stats.record_stored();
        stats.record_error(ErrorKind::Decode);
        stats.record_error(ErrorKind::StoreFailure);

        let snap = stats.snapshot();
        assert_eq!(snap.received, 2);
        assert_eq!(snap.stored, 1);
        assert_eq!(snap.decode_errors, 1);
        assert_eq!(snap.store_failures, 1);
        assert_eq!(snap.dropped, 2);
    }

    #[test]
    fn test_issue_counters() {
        let stats = IngestStats::new();
        stats.record_issue(&FieldIssue::Missing { key: "box[2]".into() });
        stats.record_issue(&FieldIssue::TypeMismatch {
            key: "score".into(),
            expected: "number",
            found: "string".into(),
        });

        let snap = stats.snapshot();
        assert_eq!(snap.missing_fields, 1);
        assert_eq!(snap.type_mismatches, 1);
        assert_eq!(snap.dropped, 0);
    }
}
