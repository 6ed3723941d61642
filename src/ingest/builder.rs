//! Detection record builder

use chrono::{DateTime, Utc};

use crate::models::{CoercedFields, DetectionRecord};

/// Stamps coerced fields with the ingestion time. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordBuilder;

impl RecordBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, fields: CoercedFields) -> DetectionRecord {
        self.build_at(fields, Utc::now())
    }

    pub fn build_at(&self, fields: CoercedFields, created_date: DateTime<Utc>) -> DetectionRecord {
        DetectionRecord::from_fields(fields, created_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_build_stamps_ingestion_time() {
        let started = Utc::now();
        let record = RecordBuilder::new().build(CoercedFields::default());
        assert!(record.created_date >= started);
        assert!(record.created_date <= Utc::now());
    }

    #[test]
    fn test_build_copies_fields() {
        let fields = CoercedFields {
            user_id: "u1".to_string(),
            detection_process_id: "p1".to_string(),
            clazz: "person".to_string(),
            score: 0.42,
            num_frame: 7,
            num_object: 1,
            bbox: [1, 2, 3, 4],
            image: "frame-7.jpg".to_string(),
        };
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let record = RecordBuilder::new().build_at(fields.clone(), at);

        assert_eq!(record.user_id, fields.user_id);
        assert_eq!(record.detection_process_id, fields.detection_process_id);
        assert_eq!(record.clazz, fields.clazz);
        assert_eq!(record.score, fields.score);
        assert_eq!(record.num_frame, fields.num_frame);
        assert_eq!(record.num_object, fields.num_object);
        assert_eq!(record.bbox, fields.bbox);
        assert_eq!(record.image, fields.image);
        assert_eq!(record.created_date, at);
    }

    #[test]
    fn test_build_accepts_out_of_range_score() {
        let fields = CoercedFields { score: 3.5, ..Default::default() };
        assert_eq!(RecordBuilder::new().build(fields).score, 3.5);
    }
}
