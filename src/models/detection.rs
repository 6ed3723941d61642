//! Detection record model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Typed attribute values of one detection, before timestamping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoercedFields {
    pub user_id: String,
    pub detection_process_id: String,
    pub clazz: String,
    pub score: f64,
    pub num_frame: i32,
    pub num_object: i32,
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    pub image: String,
}

/// One detected object in one frame, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionRecord {
    pub user_id: String,
    pub detection_process_id: String,
    pub clazz: String,
    pub score: f64,
    pub num_frame: i32,
    pub num_object: i32,
    #[serde(rename = "box")]
    pub bbox: [i32; 4],
    pub image: String,
    /// Ingestion time, not emission time
    pub created_date: DateTime<Utc>,
}

impl DetectionRecord {
    pub fn from_fields(fields: CoercedFields, created_date: DateTime<Utc>) -> Self {
        let CoercedFields {
            user_id,
            detection_process_id,
            clazz,
            score,
            num_frame,
            num_object,
            bbox,
            image,
        } = fields;

        Self {
            user_id,
            detection_process_id,
            clazz,
            score,
            num_frame,
            num_object,
            bbox,
            image,
            created_date,
        }
    }

    /// Natural key of a detection: one object slot in one frame of one run
    pub fn idempotency_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.user_id.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.detection_process_id.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.num_frame.to_string().as_bytes());
        hasher.update(b"\n");
        hasher.update(self.num_object.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
