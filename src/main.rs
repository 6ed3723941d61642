//! Stat Service entry point

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validator::Validate;

use stat_service::{
    config::Config,
    consumer::{ConsumerSettings, StatConsumer},
    create_router, db,
    ingest::{AttributeCoercer, DeliveryPolicy, Dispatcher, EnvelopeCodec, IngestStats, RecordBuilder},
    store::PgDetectionStore,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    init_tracing(config.is_production());

    config.validate().context("Invalid configuration")?;

    tracing::info!("Stat Service starting...");
    tracing::info!("Database: {}", config.database_display());

    // Initialize database pool
    let pool = db::create_pool(&config.database_url, config.concurrency)
        .await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool)
        .await
        .context("Failed to run migrations")?;

    // Wire the ingestion path
    let stats = Arc::new(IngestStats::new());
    let coercer = AttributeCoercer::new(config.coercion_mode);
    tracing::info!("Coercion mode: {}", coercer.mode());
    let store = Arc::new(PgDetectionStore::new(pool, config.deduplicate));
    let dispatcher = Arc::new(Dispatcher::new(
        EnvelopeCodec::new(),
        coercer,
        RecordBuilder::new(),
        store,
        stats.clone(),
    ));

    // Health server
    let app = create_router(AppState { stats });
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Health endpoint listening on http://{}/health", addr);

    let health = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Health server error: {}", e);
        }
    });

    // Consume until shutdown
    let consumer = StatConsumer::new(
        dispatcher,
        DeliveryPolicy::new(config.requeue_on_store_failure),
        ConsumerSettings::from(&config),
    );
    let result = consumer.run(shutdown_signal()).await;

    health.abort();
    result.context("Stat consumer failed")?;

    tracing::info!("Stat Service stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "stat_service=debug,tower_http=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
