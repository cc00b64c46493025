//! Face encoding with an ArcFace model.
//!
//! Each detected face is aligned to the 112×112 ArcFace template from its
//! five landmarks (or, lacking landmarks, cropped square around its box) and
//! encoded as an L2-normalized 512-dimensional vector.

use crate::alignment::{self, ALIGNED_SIZE};
use crate::types::{BoundingBox, Embedding};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_MEAN: f32 = 127.5;
/// ArcFace inputs are scaled symmetrically into [-1, 1].
const ARCFACE_STD: f32 = 127.5;
/// Length of every encoding the recognizer produces.
pub const ARCFACE_EMBEDDING_DIM: usize = 512;
/// Margin added around a landmark-less detector box before cropping, as a fraction of its size.
const CROP_MARGIN: f32 = 0.1;

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("model file not found: {0}; download it from insightface and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face box lies outside the image")]
    EmptyCrop,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Produces one encoding per face crop.
pub struct FaceRecognizer {
    session: Session,
}

impl FaceRecognizer {
    /// Load `w600k_r50.onnx` (or a compatible ArcFace export).
    pub fn load(model_path: &Path) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(path = %model_path.display(), "loaded ArcFace model");
        Ok(Self { session })
    }

    /// Extract the encoding of one detected face.
    pub fn extract(&mut self, image: &RgbImage, face: &BoundingBox) -> Result<Embedding, RecognizerError> {
        let crop = face_crop(image, face).ok_or(RecognizerError::EmptyCrop)?;
        let input = preprocess(&crop);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding::new(l2_normalize(raw)))
    }
}

fn face_crop(image: &RgbImage, face: &BoundingBox) -> Option<RgbImage> {
    face.landmarks
        .and_then(|points| alignment::align_face(image, &points))
        .or_else(|| crop_face(image, face))
}

/// Square crop around the face box with a small margin, clamped to the image,
/// resized to the model input.
fn crop_face(image: &RgbImage, face: &BoundingBox) -> Option<RgbImage> {
    let side = face.width.max(face.height) * (1.0 + CROP_MARGIN * 2.0);
    let cx = face.x + face.width / 2.0;
    let cy = face.y + face.height / 2.0;

    let x0 = (cx - side / 2.0).max(0.0) as u32;
    let y0 = (cy - side / 2.0).max(0.0) as u32;
    let x1 = ((cx + side / 2.0).max(0.0) as u32).min(image.width());
    let y1 = ((cy + side / 2.0).max(0.0) as u32).min(image.height());
    if x1 <= x0 || y1 <= y0 {
        return None;
    }

    let cropped = imageops::crop_imm(image, x0, y0, x1 - x0, y1 - y0).to_image();
    Some(imageops::resize(
        &cropped,
        ALIGNED_SIZE,
        ALIGNED_SIZE,
        FilterType::Triangle,
    ))
}

/// Normalize a 112×112 RGB crop into a NCHW float tensor.
fn preprocess(face: &RgbImage) -> Array4<f32> {
    let size = ALIGNED_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in face.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel.0[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }
    tensor
}

fn l2_normalize(raw: &[f32]) -> Vec<f64> {
    let norm = raw.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|&x| x as f64 / norm).collect()
    } else {
        raw.iter().map(|&x| x as f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x: f32, y: f32, w: f32, h: f32) -> BoundingBox {
        BoundingBox { x, y, width: w, height: h, confidence: 0.9, landmarks: None }
    }

    #[test]
    fn test_crop_face_is_model_sized() {
        let image = RgbImage::new(320, 240);
        let crop = crop_face(&image, &bbox(100.0, 50.0, 80.0, 100.0)).unwrap();
        assert_eq!(crop.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
    }

    #[test]
    fn test_landmarks_select_aligned_crop() {
        // A red frame with a white square exactly where the landmarks say the
        // face sits; the aligned crop covers only white, the box crop does not.
        let mut image = RgbImage::from_pixel(320, 240, image::Rgb([255, 0, 0]));
        for y in 40..200 {
            for x in 80..240 {
                image.put_pixel(x, y, image::Rgb([255, 255, 255]));
            }
        }
        let landmarks = alignment::ARCFACE_TEMPLATE.map(|(x, y)| (x + 104.0, y + 64.0));
        let mut face = bbox(0.0, 0.0, 320.0, 240.0);

        let unaligned = face_crop(&image, &face).unwrap();
        assert_eq!(unaligned.get_pixel(0, 56).0, [255, 0, 0]);

        face.landmarks = Some(landmarks);
        let aligned = face_crop(&image, &face).unwrap();
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));
        assert!(aligned.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_crop_face_outside_image() {
        let image = RgbImage::new(64, 64);
        assert!(crop_face(&image, &bbox(200.0, 200.0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn test_preprocess_normalization() {
        let face = RgbImage::from_pixel(112, 112, image::Rgb([0, 128, 255]));
        let tensor = preprocess(&face);
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
        assert!((tensor[[0, 0, 5, 5]] + 1.0).abs() < 1e-6);
        assert!((tensor[[0, 1, 5, 5]] - 0.5 / 127.5).abs() < 1e-6);
        assert!((tensor[[0, 2, 5, 5]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_unit_length() {
        let values = l2_normalize(&[3.0, 4.0]);
        assert!((values[0] - 0.6).abs() < 1e-6);
        assert!((values[1] - 0.8).abs() < 1e-6);
        assert_eq!(l2_normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
