//! Hand-crafted descriptor extraction: color, edge, and texture histograms.

use serde::{Deserialize, Serialize};

use crate::raster::PixelBuffer;
use crate::types::{ClassifyError, ClassifyResult};

/// 256 intensity bins per RGB channel.
pub const COLOR_BINS: usize = 768;
/// Gradient-magnitude bins.
pub const EDGE_BINS: usize = 32;
/// One bin per 8-bit local binary pattern code.
pub const TEXTURE_BINS: usize = 256;
/// Full descriptor length: color | edge | texture.
pub const FEATURE_DIM: usize = COLOR_BINS + EDGE_BINS + TEXTURE_BINS;

const SOBEL_X: [f32; 9] = [-1.0, 0.0, 1.0, -2.0, 0.0, 2.0, -1.0, 0.0, 1.0];
const SOBEL_Y: [f32; 9] = [-1.0, -2.0, -1.0, 0.0, 0.0, 0.0, 1.0, 2.0, 1.0];

/// Neighbor offsets (dy, dx) in fixed read order: NW, N, NE, W, E, SW, S, SE.
/// Bit `i` of the pattern code is set when neighbor `i` is strictly brighter
/// than the center. The order must never change: stored descriptors depend
/// on it.
const LBP_NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Fixed 1056-dimensional image descriptor: `color[768] | edge[32] |
/// texture[256]`, each segment normalized to unit sum (or all zeros when
/// its raw total was zero). Contains no NaN or infinite values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Assemble a descriptor from precomputed segments. Segment lengths
    /// must match the fixed layout.
    pub fn from_segments(color: &[f32], edge: &[f32], texture: &[f32]) -> ClassifyResult<Self> {
        if color.len() != COLOR_BINS || edge.len() != EDGE_BINS || texture.len() != TEXTURE_BINS {
            return Err(ClassifyError::InvalidInput(format!(
                "segment lengths {}/{}/{} do not match {}/{}/{}",
                color.len(),
                edge.len(),
                texture.len(),
                COLOR_BINS,
                EDGE_BINS,
                TEXTURE_BINS
            )));
        }
        let mut values = Vec::with_capacity(FEATURE_DIM);
        values.extend_from_slice(color);
        values.extend_from_slice(edge);
        values.extend_from_slice(texture);
        Ok(Self(values))
    }

    pub fn color(&self) -> &[f32] {
        &self.0[..COLOR_BINS]
    }

    pub fn edge(&self) -> &[f32] {
        &self.0[COLOR_BINS..COLOR_BINS + EDGE_BINS]
    }

    pub fn texture(&self) -> &[f32] {
        &self.0[COLOR_BINS + EDGE_BINS..]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Build the full descriptor for one raster: color, edge, and texture
/// segments concatenated in fixed order. Pure and deterministic; the only
/// failure is an undersized buffer.
pub fn extract_features(buffer: &PixelBuffer) -> ClassifyResult<FeatureVector> {
    let color = color_histogram(buffer)?;
    let edge = edge_histogram(buffer)?;
    let texture = texture_histogram(buffer)?;

    let mut values = Vec::with_capacity(FEATURE_DIM);
    values.extend_from_slice(&color);
    values.extend_from_slice(&edge);
    values.extend_from_slice(&texture);
    Ok(FeatureVector(values))
}

/// Per-channel intensity histogram over every pixel. The raw byte value is
/// the bin index; alpha is ignored. Normalized to unit sum over all 768
/// bins, so the segment always sums to 1 for a non-empty buffer.
pub fn color_histogram(buffer: &PixelBuffer) -> ClassifyResult<Vec<f32>> {
    buffer.require_interior()?;

    let mut counts = vec![0u32; COLOR_BINS];
    for px in buffer.data().chunks_exact(4) {
        counts[px[0] as usize] += 1;
        counts[256 + px[1] as usize] += 1;
        counts[512 + px[2] as usize] += 1;
    }

    // Three increments per pixel.
    let total = buffer.width() as f64 * buffer.height() as f64 * 3.0;
    Ok(counts.iter().map(|&c| (c as f64 / total) as f32).collect())
}

/// Gradient-magnitude histogram over interior pixels. Sobel kernels on the
/// red channel, magnitudes bucketed into 32 equal-width bins over
/// `[0, max]`, normalized by interior pixel count.
pub fn edge_histogram(buffer: &PixelBuffer) -> ClassifyResult<Vec<f32>> {
    buffer.require_interior()?;

    let w = buffer.width();
    let h = buffer.height();
    let mut magnitudes = Vec::with_capacity((w as usize - 2) * (h as usize - 2));

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut gx = 0.0f32;
            let mut gy = 0.0f32;
            for ky in -1i32..=1 {
                for kx in -1i32..=1 {
                    let v = buffer.red((x as i32 + kx) as u32, (y as i32 + ky) as u32) as f32;
                    let k = ((ky + 1) * 3 + (kx + 1)) as usize;
                    gx += v * SOBEL_X[k];
                    gy += v * SOBEL_Y[k];
                }
            }
            magnitudes.push((gx * gx + gy * gy).sqrt());
        }
    }

    let max = magnitudes.iter().fold(0.0f32, |m, &v| m.max(v));
    // A perfectly flat interior still buckets into bin 0.
    let max = if max > 0.0 { max } else { 1.0 };

    let mut counts = vec![0u32; EDGE_BINS];
    for &mag in &magnitudes {
        let bin = ((mag / max) * (EDGE_BINS - 1) as f32) as usize;
        counts[bin.min(EDGE_BINS - 1)] += 1;
    }

    let total = magnitudes.len() as f64;
    Ok(counts.iter().map(|&c| (c as f64 / total) as f32).collect())
}

/// Local binary pattern histogram over interior pixels: one 8-bit code per
/// pixel from strict greater-than comparisons against its 8 neighbors,
/// normalized by interior pixel count.
pub fn texture_histogram(buffer: &PixelBuffer) -> ClassifyResult<Vec<f32>> {
    buffer.require_interior()?;

    let w = buffer.width();
    let h = buffer.height();
    let mut counts = vec![0u32; TEXTURE_BINS];

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let center = buffer.red(x, y);
            let mut code = 0u8;
            for (i, (dy, dx)) in LBP_NEIGHBORS.iter().enumerate() {
                let neighbor = buffer.red((x as i32 + dx) as u32, (y as i32 + dy) as u32);
                if neighbor > center {
                    code |= 1 << i;
                }
            }
            counts[code as usize] += 1;
        }
    }

    let total = ((w - 2) as f64) * ((h - 2) as f64);
    Ok(counts.iter().map(|&c| (c as f64 / total) as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> PixelBuffer {
        let data: Vec<u8> = rgba
            .iter()
            .copied()
            .cycle()
            .take(w as usize * h as usize * 4)
            .collect();
        PixelBuffer::new(w, h, data).unwrap()
    }

    /// 1-pixel black/white checkerboard.
    fn checkerboard(w: u32, h: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity(w as usize * h as usize * 4);
        for y in 0..h {
            for x in 0..w {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::new(w, h, data).unwrap()
    }

    /// Left half black, right half white.
    fn vertical_step(w: u32, h: u32) -> PixelBuffer {
        let mut data = Vec::with_capacity(w as usize * h as usize * 4);
        for _y in 0..h {
            for x in 0..w {
                let v = if x < w / 2 { 0 } else { 255 };
                data.extend_from_slice(&[v, v, v, 255]);
            }
        }
        PixelBuffer::new(w, h, data).unwrap()
    }

    fn assert_unit_sum(segment: &[f32]) {
        let sum: f64 = segment.iter().map(|&v| v as f64).sum();
        assert!((sum - 1.0).abs() < 1e-6, "segment sum {sum}");
    }

    #[test]
    fn descriptor_has_fixed_length_and_finite_values() {
        let features = extract_features(&checkerboard(10, 10)).unwrap();
        assert_eq!(features.len(), FEATURE_DIM);
        assert!(features.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn segments_sum_to_one() {
        let features = extract_features(&checkerboard(10, 10)).unwrap();
        assert_unit_sum(features.color());
        assert_unit_sum(features.edge());
        assert_unit_sum(features.texture());
    }

    #[test]
    fn color_histogram_of_solid_red() {
        let hist = color_histogram(&solid(10, 10, [255, 0, 0, 255])).unwrap();
        let third = 1.0 / 3.0;
        assert!((hist[255] - third).abs() < 1e-6); // R = 255
        assert!((hist[256] - third).abs() < 1e-6); // G = 0
        assert!((hist[512] - third).abs() < 1e-6); // B = 0
        assert_unit_sum(&hist);
    }

    #[test]
    fn flat_image_concentrates_edge_and_texture_in_bin_zero() {
        let buf = solid(10, 10, [128, 128, 128, 255]);
        let edge = edge_histogram(&buf).unwrap();
        assert!((edge[0] - 1.0).abs() < 1e-6);
        assert!(edge[1..].iter().all(|&v| v == 0.0));

        let texture = texture_histogram(&buf).unwrap();
        assert!((texture[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn vertical_step_splits_edge_bins() {
        // 10x10 step at x=5: rows of interior pixels where the Sobel
        // window straddles the step (x = 4, 5) all share the maximum
        // magnitude; the rest are flat.
        let edge = edge_histogram(&vertical_step(10, 10)).unwrap();
        assert!((edge[0] - 0.75).abs() < 1e-6);
        assert!((edge[EDGE_BINS - 1] - 0.25).abs() < 1e-6);
        assert_unit_sum(&edge);
    }

    #[test]
    fn checkerboard_texture_codes() {
        // White centers see no strictly brighter neighbor (code 0); black
        // centers see brighter N/W/E/S (bits 1,3,4,6 = code 90).
        let texture = texture_histogram(&checkerboard(10, 10)).unwrap();
        assert!((texture[0] - 0.5).abs() < 1e-6);
        assert!((texture[90] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn undersized_buffers_are_rejected() {
        let buf = solid(2, 2, [0, 0, 0, 255]);
        for result in [
            color_histogram(&buf),
            edge_histogram(&buf),
            texture_histogram(&buf),
        ] {
            assert!(matches!(
                result,
                Err(ClassifyError::BufferTooSmall { width: 2, height: 2 })
            ));
        }
        assert!(extract_features(&buf).is_err());
    }

    #[test]
    fn from_segments_validates_lengths() {
        let ok = FeatureVector::from_segments(
            &[0.0; COLOR_BINS],
            &[0.0; EDGE_BINS],
            &[0.0; TEXTURE_BINS],
        );
        assert!(ok.is_ok());
        let bad = FeatureVector::from_segments(&[0.0; 10], &[0.0; EDGE_BINS], &[0.0; TEXTURE_BINS]);
        assert!(bad.is_err());
    }

    #[test]
    fn extraction_is_deterministic() {
        let buf = checkerboard(12, 9);
        assert_eq!(
            extract_features(&buf).unwrap(),
            extract_features(&buf).unwrap()
        );
    }
}
