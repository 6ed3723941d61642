//! Ingestion path: raw bytes -> envelope -> typed detection -> store

pub mod builder;
pub mod codec;
pub mod coerce;
pub mod dispatcher;
pub mod policy;
pub mod stats;

pub use builder::RecordBuilder;
pub use codec::EnvelopeCodec;
pub use coerce::{AttributeCoercer, Coercion, FieldIssue};
pub use dispatcher::{Dispatcher, Disposition};
pub use policy::{Acknowledgement, DeliveryPolicy};
pub use stats::{IngestStats, StatsSnapshot};
