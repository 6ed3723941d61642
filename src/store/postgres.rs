//! Postgres detection store

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DetectionStore, SaveOutcome};
use crate::error::StoreError;
use crate::models::DetectionRecord;

#[derive(Clone)]
pub struct PgDetectionStore {
    pool: PgPool,
    deduplicate: bool,
}

impl PgDetectionStore {
    pub fn new(pool: PgPool, deduplicate: bool) -> Self {
        Self { pool, deduplicate }
    }
}

#[async_trait]
impl DetectionStore for PgDetectionStore {
    async fn save(&self, record: &DetectionRecord) -> Result<SaveOutcome, StoreError> {
        // NULL keys never conflict, so dedup is off unless a key is written
        let dedup_key = self.deduplicate.then(|| record.idempotency_key());

        let id: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO detection_objects (id, user_id, detection_process_id, clazz, score, num_frame, num_object, box, image, created_date, dedup_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (dedup_key) DO NOTHING
            RETURNING id
            "#
        )
        .bind(Uuid::new_v4())
        .bind(&record.user_id)
        .bind(&record.detection_process_id)
        .bind(&record.clazz)
        .bind(record.score)
        .bind(record.num_frame)
        .bind(record.num_object)
        .bind(record.bbox.to_vec())
        .bind(&record.image)
        .bind(record.created_date)
        .bind(dedup_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match id {
            Some(id) => SaveOutcome::Inserted(id),
            None => SaveOutcome::Duplicate,
        })
    }
}
