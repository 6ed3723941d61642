//! Event dispatcher - subscription entry point
//!
//! Decodes each message, routes it by event type and hands detections to the
//! store. Every failure ends here: it is logged, counted and turned into a
//! `Disposition`, never propagated to the broker loop.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::builder::RecordBuilder;
use super::codec::EnvelopeCodec;
use super::coerce::AttributeCoercer;
use super::stats::IngestStats;
use crate::error::{ErrorKind, IngestResult};
use crate::models::{StatEvent, StatEventType};
use crate::store::{DetectionStore, SaveOutcome};

/// How one message ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Stored(Uuid),
    Duplicate,
    Ignored(StatEventType),
    Dropped(ErrorKind),
}

/// Successful end of a message, before counting
enum Handled {
    Stored(Uuid),
    Duplicate,
    Ignored(StatEventType),
}

pub struct Dispatcher {
    codec: EnvelopeCodec,
    coercer: AttributeCoercer,
    builder: RecordBuilder,
    store: Arc<dyn DetectionStore>,
    stats: Arc<IngestStats>,
}

impl Dispatcher {
    pub fn new(
        codec: EnvelopeCodec,
        coercer: AttributeCoercer,
        builder: RecordBuilder,
        store: Arc<dyn DetectionStore>,
        stats: Arc<IngestStats>,
    ) -> Self {
        Self {
            codec,
            coercer,
            builder,
            store,
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<IngestStats> {
        &self.stats
    }

    /// Handle one raw message. Infallible by contract.
    pub async fn on_message(&self, body: &[u8]) -> Disposition {
        self.stats.record_received();

        match self.dispatch(body).await {
            Ok(Handled::Stored(id)) => {
                self.stats.record_stored();
                Disposition::Stored(id)
            }
            Ok(Handled::Duplicate) => {
                self.stats.record_duplicate();
                Disposition::Duplicate
            }
            Ok(Handled::Ignored(event_type)) => {
                self.stats.record_ignored();
                Disposition::Ignored(event_type)
            }
            Err(err) => {
                let kind = err.kind();
                warn!(kind = %kind, error = %err, "Stat-event dropped");
                self.stats.record_error(kind);
                Disposition::Dropped(kind)
            }
        }
    }

    async fn dispatch(&self, body: &[u8]) -> IngestResult<Handled> {
        let event = self.codec.decode(body)?;

        match event.event_type {
            StatEventType::ObjectDetection => self.handle_object_detection(&event).await,
            other @ (StatEventType::ObjectTracking | StatEventType::VideoClassification) => {
                debug!(event_type = %other, "Stat-event ignored");
                Ok(Handled::Ignored(other))
            }
        }
    }

    async fn handle_object_detection(&self, event: &StatEvent) -> IngestResult<Handled> {
        let coercion = self.coercer.apply(&event.attributes)?;

        for issue in &coercion.issues {
            warn!(
                user_id = %coercion.fields.user_id,
                detection_process_id = %coercion.fields.detection_process_id,
                issue = %issue,
                "Detection attribute defaulted"
            );
            self.stats.record_issue(issue);
        }
        if !coercion.is_clean() {
            self.stats.record_defaulted();
        }

        let record = self.builder.build(coercion.fields);

        match self.store.save(&record).await? {
            SaveOutcome::Inserted(id) => {
                debug!(
                    id = %id,
                    clazz = %record.clazz,
                    num_frame = record.num_frame,
                    num_object = record.num_object,
                    "Detection stored"
                );
                Ok(Handled::Stored(id))
            }
            SaveOutcome::Duplicate => {
                debug!(
                    detection_process_id = %record.detection_process_id,
                    num_frame = record.num_frame,
                    num_object = record.num_object,
                    "Duplicate detection skipped"
                );
                Ok(Handled::Duplicate)
            }
        }
    }
}
