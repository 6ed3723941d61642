//! Stat Service
//!
//! Turns detection statistics broadcast by the detection pipeline into
//! durable detection records.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        STAT SERVICE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌──────────────────────────────────────┐    │
//! │  │ Consumer  │──▶│ Dispatcher                           │    │
//! │  │ (lapin)   │   │  codec ─▶ coercer ─▶ builder ─▶ store │    │
//! │  └───────────┘   └───────────────────┬──────────────────┘    │
//! │  ┌───────────┐                       ▼                       │
//! │  │ /health   │◀── stats        ┌─────────────┐               │
//! │  │ (Axum)    │                 │ PostgreSQL  │               │
//! │  └───────────┘                 └─────────────┘               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod constants;
pub mod consumer;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod store;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub use error::{ErrorKind, IngestError, IngestResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub stats: Arc<ingest::IngestStats>,
}

/// Create the health router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
