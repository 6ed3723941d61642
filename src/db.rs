//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool, sized to the consumer worker count
pub async fn create_pool(database_url: &str, workers: usize) -> Result<PgPool, sqlx::Error> {
    let max_connections = u32::try_from(workers).unwrap_or(u32::MAX).max(2);

    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Detected objects (one row per object per frame)
CREATE TABLE IF NOT EXISTS detection_objects (
    id UUID PRIMARY KEY,
    user_id VARCHAR(255) NOT NULL,
    detection_process_id VARCHAR(255) NOT NULL,
    clazz VARCHAR(255) NOT NULL,
    score DOUBLE PRECISION NOT NULL,
    num_frame INT NOT NULL,
    num_object INT NOT NULL,
    box INT[] NOT NULL,
    image TEXT NOT NULL,
    created_date TIMESTAMPTZ NOT NULL,
    dedup_key VARCHAR(64) UNIQUE
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_detection_objects_process ON detection_objects(detection_process_id, num_frame);
CREATE INDEX IF NOT EXISTS idx_detection_objects_user ON detection_objects(user_id, created_date);
"#;
