//! Nearest-neighbour identity matching over registered encodings.

use crate::types::{Embedding, KnownFace, UNKNOWN_LABEL};
use thiserror::Error;
use tracing::warn;

/// Maximum Euclidean distance accepted as the same person.
///
/// Calibrated for L2-normalized ArcFace encodings: a distance of 1.1
/// corresponds to a cosine similarity of roughly 0.4.
pub const DEFAULT_TOLERANCE: f64 = 1.1;

#[derive(Error, Debug, PartialEq)]
pub enum MatchError {
    #[error("no registered faces to compare against")]
    EmptyGallery,
}

/// Result of matching a probe encoding against the known faces.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Label of the nearest known face, if it fell within tolerance.
    pub label: Option<String>,
    /// Distance to the nearest known face.
    pub distance: f64,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.label.is_some()
    }

    /// The matched label, or `"Unknown"`.
    pub fn label_or_unknown(&self) -> &str {
        self.label.as_deref().unwrap_or(UNKNOWN_LABEL)
    }
}

/// Strategy for comparing a probe encoding against the known faces.
pub trait Matcher {
    fn best_match(&self, probe: &Embedding, known: &[KnownFace]) -> Result<MatchResult, MatchError>;
}

/// Euclidean nearest-neighbour matcher with a fixed acceptance tolerance.
#[derive(Debug, Clone, Copy)]
pub struct EuclideanMatcher {
    pub tolerance: f64,
}

impl Default for EuclideanMatcher {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl EuclideanMatcher {
    /// Per-entry acceptance: `distance <= tolerance` for each known face.
    /// An encoding whose length differs from the probe is never accepted.
    pub fn compare(&self, probe: &Embedding, known: &[KnownFace]) -> Vec<bool> {
        known
            .iter()
            .map(|face| {
                face.embedding
                    .distance(probe)
                    .is_some_and(|d| d <= self.tolerance)
            })
            .collect()
    }

    /// Distance from the probe to every known face, in order. Encodings of
    /// a different length are infinitely far away.
    pub fn distances(&self, probe: &Embedding, known: &[KnownFace]) -> Vec<f64> {
        known
            .iter()
            .map(|face| face.embedding.distance(probe).unwrap_or(f64::INFINITY))
            .collect()
    }
}

impl Matcher for EuclideanMatcher {
    fn best_match(&self, probe: &Embedding, known: &[KnownFace]) -> Result<MatchResult, MatchError> {
        for face in known.iter().filter(|f| f.embedding.len() != probe.len()) {
            warn!(
                label = %face.label,
                expected = probe.len(),
                got = face.embedding.len(),
                "skipping known face with mismatched encoding length"
            );
        }

        let matches = self.compare(probe, known);
        let distances = self.distances(probe, known);

        // First index wins on ties.
        let (best_idx, best_distance) = distances
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            })
            .ok_or(MatchError::EmptyGallery)?;

        let label = matches[best_idx].then(|| known[best_idx].label.clone());
        Ok(MatchResult {
            label,
            distance: best_distance,
        })
    }
}
