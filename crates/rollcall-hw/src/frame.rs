//! Frame type and pixel conversion: YUYV/GREY/Y16 to RGB, dark detection.

use image::RgbImage;

/// A captured RGB camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB8 pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub sequence: u32,
    pub is_dark: bool,
}

impl Frame {
    /// Convert into an `image` buffer for detection.
    pub fn into_image(self) -> Result<RgbImage, FrameError> {
        let expected = (self.width * self.height * 3) as usize;
        let actual = self.data.len();
        RgbImage::from_raw(self.width, self.height, self.data)
            .ok_or(FrameError::InvalidLength { expected, actual })
    }
}

/// Convert packed YUYV (4:2:2) to RGB using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V]; both pixels share U and V.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for quad in yuyv[..expected].chunks_exact(4) {
        let u = quad[1] as f32 - 128.0;
        let v = quad[3] as f32 - 128.0;
        for y in [quad[0], quad[2]] {
            let y = y as f32;
            rgb.push(clamp_u8(y + 1.402 * v));
            rgb.push(clamp_u8(y - 0.344_136 * u - 0.714_136 * v));
            rgb.push(clamp_u8(y + 1.772 * u));
        }
    }
    Ok(rgb)
}

/// Replicate an 8-bit grayscale buffer into RGB.
pub fn grey_to_rgb(gray: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height) as usize;
    if gray.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: gray.len(),
        });
    }
    Ok(gray[..expected].iter().flat_map(|&p| [p, p, p]).collect())
}

/// Downscale 16-bit little-endian grayscale to 8 bits and replicate into RGB.
pub fn y16_to_rgb(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let expected = (width * height * 2) as usize;
    if buf.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: buf.len(),
        });
    }
    // High byte of each little-endian sample.
    Ok(buf[..expected]
        .chunks_exact(2)
        .flat_map(|px| [px[1], px[1], px[1]])
        .collect())
}

/// True if more than `threshold_pct` of pixels are near black (luma < 32).
///
/// Cameras often emit a few dark frames while auto-exposure settles.
pub fn is_dark_frame(rgb: &[u8], threshold_pct: f32) -> bool {
    if rgb.len() < 3 {
        return true;
    }
    let pixels = rgb.len() / 3;
    let dark = rgb
        .chunks_exact(3)
        .filter(|px| luma(px[0], px[1], px[2]) < 32.0)
        .count();
    (dark as f32 / pixels as f32) > threshold_pct
}

fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

fn clamp_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_neutral_chroma_is_gray() {
        // 2x1 image: [Y0=100, U=128, Y1=200, V=128]
        let rgb = yuyv_to_rgb(&[100, 128, 200, 128], 2, 1).unwrap();
        assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
    }

    #[test]
    fn test_yuyv_red_chroma() {
        // Strong V pushes red up and green down.
        let rgb = yuyv_to_rgb(&[128, 128, 128, 255], 2, 1).unwrap();
        assert_eq!(rgb[0], 255);
        assert!(rgb[1] < 128);
        assert_eq!(rgb[2], 128);
    }

    #[test]
    fn test_yuyv_invalid_length() {
        assert!(yuyv_to_rgb(&[100, 128], 2, 1).is_err());
    }

    #[test]
    fn test_grey_and_y16_replicate() {
        assert_eq!(grey_to_rgb(&[7, 9], 2, 1).unwrap(), vec![7, 7, 7, 9, 9, 9]);
        // 0x1234 little-endian → high byte 0x12
        assert_eq!(y16_to_rgb(&[0x34, 0x12], 1, 1).unwrap(), vec![0x12, 0x12, 0x12]);
    }

    #[test]
    fn test_dark_frame_detection() {
        assert!(is_dark_frame(&vec![0u8; 300], 0.95));
        assert!(!is_dark_frame(&vec![128u8; 300], 0.95));
        assert!(is_dark_frame(&[], 0.95));

        // 94% dark, 6% bright → not dark
        let mut rgb = vec![10u8; 94 * 3];
        rgb.extend(vec![200u8; 6 * 3]);
        assert!(!is_dark_frame(&rgb, 0.95));
    }

    #[test]
    fn test_into_image_checks_length() {
        let frame = Frame { data: vec![0; 5], width: 2, height: 1, sequence: 0, is_dark: true };
        assert!(frame.into_image().is_err());

        let frame = Frame { data: vec![0; 6], width: 2, height: 1, sequence: 0, is_dark: true };
        assert_eq!(frame.into_image().unwrap().dimensions(), (2, 1));
    }
}
