use serde::{Deserialize, Serialize};

/// Label used when a face or record cannot be attributed to anyone.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// The only attendance status rollcall ever writes.
pub const STATUS_PRESENT: &str = "present";

/// Bounding box for a detected face, with optional facial landmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    /// Five-point facial landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

/// Fixed-length facial encoding used for nearest-neighbour comparison.
///
/// Serialized as a bare array of numbers so stored documents read
/// `"encoding": [0.01, -0.2, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f64>,
}

impl Embedding {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean distance between two encodings, or `None` when their
    /// lengths differ.
    pub fn distance(&self, other: &Embedding) -> Option<f64> {
        if self.len() != other.len() {
            return None;
        }
        let sum = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>();
        Some(sum.sqrt())
    }
}

/// A registered attendee, stored in the `face_encodings` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub roll_number: String,
    pub encoding: Embedding,
}

/// A presence event, stored in the `attendance` collection.
///
/// The facial path fills `name`, the speech path fills `roll_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl AttendanceRecord {
    pub fn present_by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            roll_number: None,
            status: Some(STATUS_PRESENT.to_string()),
        }
    }

    pub fn present_by_roll(roll_number: impl Into<String>) -> Self {
        Self {
            name: None,
            roll_number: Some(roll_number.into()),
            status: Some(STATUS_PRESENT.to_string()),
        }
    }

    /// `name`, else `roll_number`, else `"Unknown"`.
    pub fn display_label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.roll_number.as_deref())
            .unwrap_or(UNKNOWN_LABEL)
    }

    /// `status`, else `"Unknown"`.
    pub fn display_status(&self) -> &str {
        self.status.as_deref().unwrap_or(UNKNOWN_LABEL)
    }
}

/// A labelled encoding the matcher compares probes against.
#[derive(Debug, Clone)]
pub struct KnownFace {
    pub label: String,
    pub embedding: Embedding,
}

impl From<Identity> for KnownFace {
    fn from(identity: Identity) -> Self {
        Self {
            label: identity.name,
            embedding: identity.encoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_identical() {
        let a = Embedding::new(vec![0.5, -0.25, 1.0]);
        assert_eq!(a.distance(&a.clone()), Some(0.0));
    }

    #[test]
    fn test_distance_pythagorean() {
        let a = Embedding::new(vec![0.0, 0.0]);
        let b = Embedding::new(vec![3.0, 4.0]);
        assert!((a.distance(&b).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_requires_equal_lengths() {
        let probe = Embedding::new(vec![5.0; 512]);
        assert_eq!(Embedding::new(Vec::new()).distance(&probe), None);
        assert_eq!(Embedding::new(vec![5.0; 128]).distance(&probe), None);
    }

    #[test]
    fn test_identity_serializes_encoding_as_array() {
        let identity = Identity {
            name: "Ada".into(),
            roll_number: "42".into(),
            encoding: Embedding::new(vec![0.5, 1.5]),
        };
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(json["encoding"], serde_json::json!([0.5, 1.5]));
        assert_eq!(json["roll_number"], "42");
    }

    #[test]
    fn test_attendance_record_omits_missing_fields() {
        let json = serde_json::to_value(AttendanceRecord::present_by_roll("17")).unwrap();
        assert_eq!(json, serde_json::json!({"roll_number": "17", "status": "present"}));
    }

    #[test]
    fn test_display_fallbacks() {
        let by_name = AttendanceRecord::present_by_name("Grace");
        assert_eq!(by_name.display_label(), "Grace");

        let by_roll = AttendanceRecord::present_by_roll("7");
        assert_eq!(by_roll.display_label(), "7");

        let empty = AttendanceRecord { name: None, roll_number: None, status: None };
        assert_eq!(empty.display_label(), UNKNOWN_LABEL);
        assert_eq!(empty.display_status(), UNKNOWN_LABEL);
    }
}
