//! Attribute coercer
//!
//! Reads the fixed detection keys out of the dynamic attribute payload.
//! Every missing or mistyped key is recorded as a `FieldIssue` and the field
//! takes its zero value, so a caller always gets a complete `CoercedFields`
//! plus the list of what had to be defaulted. `CoercionMode` decides whether
//! issues only get reported or fail the message.

use std::fmt;

use serde_json::Value;

use crate::config::CoercionMode;
use crate::error::{IngestError, IngestResult};
use crate::models::{Attributes, CoercedFields};

pub const KEY_USER_ID: &str = "userId";
pub const KEY_DETECTION_PROCESS_ID: &str = "detectionProcessId";
pub const KEY_CLAZZ: &str = "clazz";
pub const KEY_SCORE: &str = "score";
/// Wire name of the frame index
pub const KEY_ITERATION: &str = "iteration";
pub const KEY_NUM_OBJECT: &str = "numObject";
pub const KEY_BOX: &str = "box";
pub const KEY_IMAGE: &str = "image";

const BOX_LEN: usize = 4;

/// One attribute that could not be read as expected
#[derive(Debug, Clone, PartialEq)]
pub enum FieldIssue {
    Missing {
        key: String,
    },
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: String,
    },
}

impl FieldIssue {
    pub fn key(&self) -> &str {
        match self {
            FieldIssue::Missing { key } => key,
            FieldIssue::TypeMismatch { key, .. } => key,
        }
    }

    pub fn into_error(self) -> IngestError {
        match self {
            FieldIssue::Missing { key } => IngestError::MissingField(key),
            FieldIssue::TypeMismatch { key, expected, found } => {
                IngestError::TypeMismatch { key, expected, found }
            }
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldIssue::Missing { key } => write!(f, "{} missing", key),
            FieldIssue::TypeMismatch { key, expected, found } => {
                write!(f, "{} expected {}, found {}", key, expected, found)
            }
        }
    }
}

/// Result of reading one attribute payload
#[derive(Debug, Clone, PartialEq)]
pub struct Coercion {
    pub fields: CoercedFields,
    pub issues: Vec<FieldIssue>,
}

impl Coercion {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeCoercer {
    mode: CoercionMode,
}

impl AttributeCoercer {
    pub fn new(mode: CoercionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CoercionMode {
        self.mode
    }

    /// Read every field, defaulting and recording whatever is unusable
    pub fn coerce(&self, attributes: &Attributes) -> Coercion {
        let mut reader = Reader {
            attributes,
            issues: Vec::new(),
        };

        let fields = CoercedFields {
            user_id: reader.string(KEY_USER_ID),
            detection_process_id: reader.string(KEY_DETECTION_PROCESS_ID),
            clazz: reader.string(KEY_CLAZZ),
            score: reader.float(KEY_SCORE),
            num_frame: reader.index(KEY_ITERATION),
            num_object: reader.index(KEY_NUM_OBJECT),
            bbox: reader.bbox(KEY_BOX),
            image: reader.string(KEY_IMAGE),
        };

        Coercion {
            fields,
            issues: reader.issues,
        }
    }

    /// `coerce`, then apply the mode: strict turns the first issue into an error
    pub fn apply(&self, attributes: &Attributes) -> IngestResult<Coercion> {
        let coercion = self.coerce(attributes);

        match self.mode {
            CoercionMode::Lenient => Ok(coercion),
            CoercionMode::Strict => match coercion.issues.into_iter().next() {
                Some(issue) => Err(issue.into_error()),
                None => Ok(Coercion {
                    fields: coercion.fields,
                    issues: Vec::new(),
                }),
            },
        }
    }
}

struct Reader<'a> {
    attributes: &'a Attributes,
    issues: Vec<FieldIssue>,
}

impl<'a> Reader<'a> {
    /// Present, non-null value under `key`
    fn value(&mut self, key: &str) -> Option<&'a Value> {
        let attributes = self.attributes;
        match attributes.get(key) {
            Some(Value::Null) | None => {
                self.missing(key.to_string());
                None
            }
            Some(value) => Some(value),
        }
    }

    fn string(&mut self, key: &str) -> String {
        match self.value(key) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                let found = describe(other);
                self.mismatch(key.to_string(), "string", found);
                String::new()
            }
            None => String::new(),
        }
    }

    fn float(&mut self, key: &str) -> f64 {
        match self.value(key) {
            Some(value) => match value.as_f64() {
                Some(f) => f,
                None => {
                    let found = describe(value);
                    self.mismatch(key.to_string(), "number", found);
                    0.0
                }
            },
            None => 0.0,
        }
    }

    /// Non-negative integer; whole-valued floats are accepted
    fn index(&mut self, key: &str) -> i32 {
        let Some(value) = self.value(key) else {
            return 0;
        };

        if let Some(index) = as_index(value) {
            return index;
        }

        let found = describe(value);
        self.mismatch(key.to_string(), "non-negative integer", found);
        0
    }

    /// Up to four coordinates, each truncated toward zero
    fn bbox(&mut self, key: &str) -> [i32; BOX_LEN] {
        let mut bbox = [0; BOX_LEN];

        let items = match self.value(key) {
            Some(Value::Array(items)) => items,
            Some(other) => {
                let found = describe(other);
                self.mismatch(key.to_string(), "array of numbers", found);
                return bbox;
            }
            None => return bbox,
        };

        for (i, item) in items.iter().enumerate() {
            if i >= BOX_LEN {
                self.mismatch(
                    format!("{}[{}]", key, i),
                    "at most 4 coordinates",
                    format!("{} elements", items.len()),
                );
                break;
            }

            match item.as_f64().and_then(truncate) {
                Some(coordinate) => bbox[i] = coordinate,
                None => self.mismatch(format!("{}[{}]", key, i), "number", describe(item)),
            }
        }

        // short box: trailing slots stay zero
        if items.len() < BOX_LEN {
            self.missing(format!("{}[{}]", key, items.len()));
        }

        bbox
    }

    fn missing(&mut self, key: String) {
        self.issues.push(FieldIssue::Missing { key });
    }

    fn mismatch(&mut self, key: String, expected: &'static str, found: String) {
        self.issues.push(FieldIssue::TypeMismatch { key, expected, found });
    }
}

fn as_index(value: &Value) -> Option<i32> {
    let number = match value {
        Value::Number(n) => n,
        _ => return None,
    };

    if let Some(i) = number.as_i64() {
        return i32::try_from(i).ok().filter(|i| *i >= 0);
    }

    number
        .as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= i32::MAX as f64)
        .map(|f| f as i32)
}

/// Drop the fractional part; `None` when the result does not fit an `i32`
fn truncate(value: f64) -> Option<i32> {
    let whole = value.trunc();
    if whole.is_finite() && whole >= i32::MIN as f64 && whole <= i32::MAX as f64 {
        Some(whole as i32)
    } else {
        None
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(_) => "object".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    fn attributes(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("attributes must be an object"),
        }
    }

    fn complete() -> Attributes {
        attributes(json!({
            "userId": "u1",
            "detectionProcessId": "p1",
            "clazz": "car",
            "score": 0.87,
            "iteration": 12,
            "numObject": 2,
            "box": [10.0, 20.0, 110.0, 220.0],
            "image": "<ref>"
        }))
    }

    #[test]
    fn test_complete_payload() {
        let coercion = AttributeCoercer::default().coerce(&complete());

        assert!(coercion.is_clean(), "{:?}", coercion.issues);
        let fields = coercion.fields;
        assert_eq!(fields.user_id, "u1");
        assert_eq!(fields.detection_process_id, "p1");
        assert_eq!(fields.clazz, "car");
        assert_eq!(fields.score, 0.87);
        assert_eq!(fields.num_frame, 12);
        assert_eq!(fields.num_object, 2);
        assert_eq!(fields.bbox, [10, 20, 110, 220]);
        assert_eq!(fields.image, "<ref>");
    }

    #[test]
    fn test_box_truncates_not_rounds() {
        let mut attrs = complete();
        attrs.insert("box".into(), json!([1.9, 2.1, 300.99, 400.01]));

        let coercion = AttributeCoercer::default().coerce(&attrs);
        assert_eq!(coercion.fields.bbox, [1, 2, 300, 400]);
        assert!(coercion.is_clean());
    }

    #[test]
    fn test_box_negative_truncates_toward_zero() {
        let mut attrs = complete();
        attrs.insert("box".into(), json!([-1.7, 0.2, 5, 7]));

        let coercion = AttributeCoercer::default().coerce(&attrs);
        assert_eq!(coercion.fields.bbox, [-1, 0, 5, 7]);
    }

    #[test]
    fn test_short_box_keeps_zero_slots() {
        let mut attrs = complete();
        attrs.insert("box".into(), json!([1.0, 2.0]));

        let coercion = AttributeCoercer::default().coerce(&attrs);
        assert_eq!(coercion.fields.bbox, [1, 2, 0, 0]);
        assert_eq!(coercion.issues, vec![FieldIssue::Missing { key: "box[2]".into() }]);
    }

    #[test]
    fn test_long_box_reports_extra() {
        let mut attrs = complete();
        attrs.insert("box".into(), json!([1, 2, 3, 4, 5]));

        let coercion = AttributeCoercer::default().coerce(&attrs);
        assert_eq!(coercion.fields.bbox, [1, 2, 3, 4]);
        assert_eq!(coercion.issues.len(), 1);
        assert_eq!(coercion.issues[0].key(), "box[4]");
    }

    #[test]
    fn test_missing_keys_default() {
        let coercion = AttributeCoercer::default().coerce(&Attributes::new());

        assert_eq!(coercion.fields, CoercedFields::default());
        let keys: Vec<&str> = coercion.issues.iter().map(|i| i.key()).collect();
        assert_eq!(
            keys,
            vec!["userId", "detectionProcessId", "clazz", "score", "iteration", "numObject", "box", "image"]
        );
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut attrs = complete();
        attrs.insert("clazz".into(), Value::Null);

        let coercion = AttributeCoercer::default().coerce(&attrs);
        assert_eq!(coercion.fields.clazz, "");
        assert_eq!(coercion.issues, vec![FieldIssue::Missing { key: "clazz".into() }]);
    }

    #[test]
    fn test_numeric_tolerance() {
        let mut attrs = complete();
        attrs.insert("score".into(), json!(1));
        attrs.insert("iteration".into(), json!(12.0));

        let coercion = AttributeCoercer::default().coerce(&attrs);
        assert!(coercion.is_clean());
        assert_eq!(coercion.fields.score, 1.0);
        assert_eq!(coercion.fields.num_frame, 12);
    }

    #[test]
    fn test_type_mismatches() {
        let mut attrs = complete();
        attrs.insert("userId".into(), json!(42));
        attrs.insert("score".into(), json!("high"));
        attrs.insert("iteration".into(), json!(1.5));
        attrs.insert("numObject".into(), json!(-1));
        attrs.insert("box".into(), json!([1.0, "x", 3.0, 4.0]));

        let coercion = AttributeCoercer::default().coerce(&attrs);
        let keys: Vec<&str> = coercion.issues.iter().map(|i| i.key()).collect();
        assert_eq!(keys, vec!["userId", "score", "iteration", "numObject", "box[1]"]);
        assert!(coercion
            .issues
            .iter()
            .all(|i| matches!(i, FieldIssue::TypeMismatch { .. })));

        assert_eq!(coercion.fields.user_id, "");
        assert_eq!(coercion.fields.num_object, 0);
        assert_eq!(coercion.fields.bbox, [1, 0, 3, 4]);
    }

    #[test]
    fn test_index_out_of_range() {
        let mut attrs = complete();
        attrs.insert("iteration".into(), json!(i64::from(i32::MAX) + 1));

        let coercion = AttributeCoercer::default().coerce(&attrs);
        assert_eq!(coercion.issues[0].key(), "iteration");
        assert_eq!(coercion.fields.num_frame, 0);
    }

    #[test]
    fn test_lenient_apply_keeps_issues() {
        let coercion = AttributeCoercer::new(CoercionMode::Lenient)
            .apply(&Attributes::new())
            .unwrap();
        assert_eq!(coercion.issues.len(), 8);
    }

    #[test]
    fn test_strict_apply_fails_on_first_issue() {
        let coercer = AttributeCoercer::new(CoercionMode::Strict);
        assert_eq!(coercer.mode(), CoercionMode::Strict);

        let mut attrs = complete();
        attrs.insert("box".into(), json!([1.0, 2.0]));
        let err = coercer.apply(&attrs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingField);
        assert!(err.to_string().contains("box[2]"));

        let mut attrs = complete();
        attrs.insert("score".into(), json!("high"));
        let err = coercer.apply(&attrs).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);

        assert!(coercer.apply(&complete()).unwrap().is_clean());
    }
}
