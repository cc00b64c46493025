//! rollcall-core — Attendance domain types and face identity matching.
//!
//! Faces are encoded with SCRFD detection followed by ArcFace embedding,
//! both running via ONNX Runtime on the CPU. Matching is a nearest-neighbour
//! scan over the registered encodings with a fixed Euclidean tolerance.

pub mod alignment;
pub mod detector;
pub mod encoder;
pub mod matcher;
pub mod recognizer;
pub mod types;

pub use encoder::{EncoderError, FaceEncoder};
pub use matcher::{EuclideanMatcher, MatchError, MatchResult, Matcher, DEFAULT_TOLERANCE};
pub use types::{
    AttendanceRecord, BoundingBox, Embedding, Identity, KnownFace, STATUS_PRESENT, UNKNOWN_LABEL,
};

use std::path::PathBuf;

/// Default directory holding `det_10g.onnx` and `w600k_r50.onnx`.
///
/// `$XDG_DATA_HOME/rollcall/models`, falling back to `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    data_dir().join("models")
}

/// Default SQLite database holding identities and attendance.
pub fn default_database_path() -> PathBuf {
    data_dir().join("rollcall.db")
}

/// Per-user data directory for rollcall (`$XDG_DATA_HOME/rollcall`).
pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("rollcall")
}
