//! Five-point face alignment for ArcFace.
//!
//! Fits a similarity transform (uniform scale, rotation, translation) from the
//! detected landmarks onto the canonical ArcFace template, then resamples the
//! RGB frame into a 112×112 crop.

use image::{Rgb, RgbImage};

/// Side of the aligned crop expected by ArcFace.
pub const ALIGNED_SIZE: u32 = 112;

/// Canonical landmark positions in a 112×112 ArcFace crop:
/// left eye, right eye, nose tip, left and right mouth corners.
pub const ARCFACE_TEMPLATE: [(f32, f32); 5] = [
    (38.2946, 51.6963),
    (73.5318, 51.5014),
    (56.0252, 71.7366),
    (41.5493, 92.3655),
    (70.7299, 92.2041),
];

/// `(x, y) -> (a·x - b·y + tx, b·x + a·y + ty)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity {
    pub a: f32,
    pub b: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Similarity {
    /// Least-squares fit mapping `src` onto `dst`.
    ///
    /// Returns `None` when the source points are (nearly) coincident.
    pub fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Option<Self> {
        let (sx, sy) = centroid(src);
        let (dx, dy) = centroid(dst);

        let mut dot = 0.0f32;
        let mut cross = 0.0f32;
        let mut spread = 0.0f32;
        for (&(px, py), &(qx, qy)) in src.iter().zip(dst.iter()) {
            let (px, py) = (px - sx, py - sy);
            let (qx, qy) = (qx - dx, qy - dy);
            dot += px * qx + py * qy;
            cross += px * qy - py * qx;
            spread += px * px + py * py;
        }
        if spread < 1e-6 {
            return None;
        }

        let a = dot / spread;
        let b = cross / spread;
        Some(Self {
            a,
            b,
            tx: dx - (a * sx - b * sy),
            ty: dy - (b * sx + a * sy),
        })
    }

    pub fn apply(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.a * x - self.b * y + self.tx,
            self.b * x + self.a * y + self.ty,
        )
    }

    /// Map a destination point back into source coordinates.
    fn invert(&self, (x, y): (f32, f32)) -> (f32, f32) {
        let det = self.a * self.a + self.b * self.b;
        let (x, y) = (x - self.tx, y - self.ty);
        (
            (self.a * x + self.b * y) / det,
            (self.a * y - self.b * x) / det,
        )
    }
}

fn centroid(points: &[(f32, f32); 5]) -> (f32, f32) {
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(ax, ay), &(x, y)| (ax + x, ay + y));
    (sx / 5.0, sy / 5.0)
}

/// Warp the face described by `landmarks` into a 112×112 ArcFace crop.
///
/// Pixels that map outside the frame are black.
pub fn align_face(image: &RgbImage, landmarks: &[(f32, f32); 5]) -> Option<RgbImage> {
    let transform = Similarity::estimate(landmarks, &ARCFACE_TEMPLATE)?;
    Some(RgbImage::from_fn(ALIGNED_SIZE, ALIGNED_SIZE, |ox, oy| {
        let (sx, sy) = transform.invert((ox as f32, oy as f32));
        bilinear(image, sx, sy)
    }))
}

fn bilinear(image: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let texel = |x: f32, y: f32| -> [f32; 3] {
        if x < 0.0 || y < 0.0 || x >= image.width() as f32 || y >= image.height() as f32 {
            return [0.0; 3];
        }
        let p = image.get_pixel(x as u32, y as u32).0;
        [p[0] as f32, p[1] as f32, p[2] as f32]
    };

    let tl = texel(x0, y0);
    let tr = texel(x0 + 1.0, y0);
    let bl = texel(x0, y0 + 1.0);
    let br = texel(x0 + 1.0, y0 + 1.0);

    Rgb(std::array::from_fn(|c| {
        let top = tl[c] + (tr[c] - tl[c]) * fx;
        let bottom = bl[c] + (br[c] - bl[c]) * fx;
        (top + (bottom - top) * fy).round().clamp(0.0, 255.0) as u8
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f32, f32), b: (f32, f32), eps: f32) -> bool {
        (a.0 - b.0).abs() < eps && (a.1 - b.1).abs() < eps
    }

    #[test]
    fn test_template_onto_itself_is_identity() {
        let t = Similarity::estimate(&ARCFACE_TEMPLATE, &ARCFACE_TEMPLATE).unwrap();
        assert!((t.a - 1.0).abs() < 1e-4);
        assert!(t.b.abs() < 1e-4);
        assert!(t.tx.abs() < 1e-3 && t.ty.abs() < 1e-3);
    }

    #[test]
    fn test_recovers_scale_rotation_and_shift() {
        // Template rotated 90°, doubled and moved; the fit must undo all three.
        let src = ARCFACE_TEMPLATE.map(|(x, y)| (300.0 - 2.0 * y, 50.0 + 2.0 * x));
        let t = Similarity::estimate(&src, &ARCFACE_TEMPLATE).unwrap();
        assert!(((t.a * t.a + t.b * t.b).sqrt() - 0.5).abs() < 1e-4);
        for (s, d) in src.iter().zip(ARCFACE_TEMPLATE.iter()) {
            assert!(close(t.apply(*s), *d, 1e-2), "{:?} -> {:?}", t.apply(*s), d);
        }
    }

    #[test]
    fn test_invert_round_trips() {
        let t = Similarity { a: 0.8, b: -0.3, tx: 12.0, ty: -4.0 };
        let p = (57.0, 91.0);
        assert!(close(t.invert(t.apply(p)), p, 1e-3));
    }

    #[test]
    fn test_degenerate_landmarks() {
        assert!(Similarity::estimate(&[(10.0, 10.0); 5], &ARCFACE_TEMPLATE).is_none());
        assert!(align_face(&RgbImage::new(64, 64), &[(10.0, 10.0); 5]).is_none());
    }

    #[test]
    fn test_eye_lands_on_template() {
        let mut frame = RgbImage::new(200, 200);
        // Left eye at (77.4, 87.5).
        let landmarks = ARCFACE_TEMPLATE.map(|(x, y)| (1.5 * x + 20.0, 1.5 * y + 10.0));
        for y in 84..92 {
            for x in 74..82 {
                frame.put_pixel(x, y, Rgb([255, 0, 0]));
            }
        }

        let aligned = align_face(&frame, &landmarks).unwrap();
        assert_eq!(aligned.dimensions(), (ALIGNED_SIZE, ALIGNED_SIZE));

        let (ex, ey) = ARCFACE_TEMPLATE[0];
        let eye = aligned.get_pixel(ex.round() as u32, ey.round() as u32);
        assert!(eye.0[0] > 100, "left eye pixel {:?}", eye);
        assert_eq!(aligned.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
