//! Face encoding pipeline: detect every face in an image, then encode each.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::Embedding;
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

/// SCRFD detection model file name inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "det_10g.onnx";
/// ArcFace recognition model file name inside the model directory.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Turns images into facial encodings, one per detected face.
pub struct FaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl FaceEncoder {
    /// Load both models from `model_dir`. Fails fast if either is missing.
    pub fn load(model_dir: &Path) -> Result<Self, EncoderError> {
        let detector = FaceDetector::load(&model_dir.join(DETECTOR_MODEL_FILE))?;
        let recognizer = FaceRecognizer::load(&model_dir.join(RECOGNIZER_MODEL_FILE))?;
        Ok(Self {
            detector,
            recognizer,
        })
    }

    /// Encode every face in the image, most confident detection first.
    ///
    /// An image with no detectable face yields an empty vector.
    pub fn encode(&mut self, image: &RgbImage) -> Result<Vec<Embedding>, EncoderError> {
        let faces = self.detector.detect(image)?;
        let mut encodings = Vec::with_capacity(faces.len());
        for face in &faces {
            match self.recognizer.extract(image, face) {
                Ok(embedding) => encodings.push(embedding),
                Err(RecognizerError::EmptyCrop) => {
                    tracing::debug!(?face, "skipping face box outside image bounds");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(encodings)
    }
}
