//! Detection store - durable home of detection records

pub mod postgres;

pub use postgres::PgDetectionStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::DetectionRecord;

/// What a save did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// New row with this id
    Inserted(Uuid),
    /// A record with the same idempotency key already exists
    Duplicate,
}

/// Persistence boundary for detection records.
///
/// Implementations are shared by every consumer worker and own their own
/// concurrency discipline.
#[async_trait]
pub trait DetectionStore: Send + Sync {
    async fn save(&self, record: &DetectionRecord) -> Result<SaveOutcome, StoreError>;
}
