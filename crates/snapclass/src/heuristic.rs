//! Rule-based fallback labeling for when no trained exemplars are usable.

use crate::features::FeatureVector;
use crate::types::{ClassificationResult, ClassifierSource};

/// Texture bins with more than this share of mass count toward complexity.
const ACTIVE_TEXTURE_BIN: f32 = 0.01;

/// Classify from segment statistics alone. The decision table is evaluated
/// top to bottom and the first matching row wins. Pure and deterministic;
/// never fails.
pub fn heuristic_classify(features: &FeatureVector) -> ClassificationResult {
    let color = features.color();
    let edge = features.edge();
    let texture = features.texture();

    let avg_brightness = mean(color);
    let color_variance = color
        .iter()
        .map(|&v| {
            let d = v - avg_brightness;
            d * d
        })
        .sum::<f32>()
        / color.len() as f32;
    let edge_intensity = mean(edge);
    let texture_complexity = texture.iter().filter(|&&v| v > ACTIVE_TEXTURE_BIN).count();

    let (label, confidence) = if edge_intensity > 0.5 && texture_complexity > 100 {
        ("Complex Textured", 0.85)
    } else if edge_intensity > 0.3 {
        ("Edge-Rich", 0.80)
    } else if color_variance > 0.1 {
        ("Color-Diverse", 0.75)
    } else if avg_brightness > 0.7 {
        ("Bright Scene", 0.70)
    } else if avg_brightness < 0.3 {
        ("Dark Scene", 0.70)
    } else {
        ("Neutral Scene", 0.65)
    };

    ClassificationResult {
        label: label.to_string(),
        confidence,
        source: ClassifierSource::Heuristic,
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{COLOR_BINS, EDGE_BINS, TEXTURE_BINS};

    fn features(color: Vec<f32>, edge: Vec<f32>, texture: Vec<f32>) -> FeatureVector {
        FeatureVector::from_segments(&color, &edge, &texture).unwrap()
    }

    fn classify(color: Vec<f32>, edge: Vec<f32>, texture: Vec<f32>) -> ClassificationResult {
        heuristic_classify(&features(color, edge, texture))
    }

    #[test]
    fn complex_textured_row() {
        let mut texture = vec![0.0; TEXTURE_BINS];
        for bin in texture.iter_mut().take(150) {
            *bin = 0.02;
        }
        let result = classify(vec![0.5; COLOR_BINS], vec![0.6; EDGE_BINS], texture);
        assert_eq!(result.label, "Complex Textured");
        assert!((result.confidence - 0.85).abs() < 1e-6);
        assert_eq!(result.source, ClassifierSource::Heuristic);
    }

    #[test]
    fn edge_rich_row() {
        // High edge mean but too few active texture bins for the first row.
        let result = classify(
            vec![0.5; COLOR_BINS],
            vec![0.4; EDGE_BINS],
            vec![0.0; TEXTURE_BINS],
        );
        assert_eq!(result.label, "Edge-Rich");
        assert!((result.confidence - 0.80).abs() < 1e-6);
    }

    #[test]
    fn color_diverse_row() {
        // A single heavy bin makes the variance spike.
        let mut color = vec![0.0; COLOR_BINS];
        color[0] = 10.0;
        let result = classify(color, vec![0.0; EDGE_BINS], vec![0.0; TEXTURE_BINS]);
        assert_eq!(result.label, "Color-Diverse");
        assert!((result.confidence - 0.75).abs() < 1e-6);
    }

    #[test]
    fn bright_scene_row() {
        let result = classify(
            vec![0.75; COLOR_BINS],
            vec![0.0; EDGE_BINS],
            vec![0.0; TEXTURE_BINS],
        );
        assert_eq!(result.label, "Bright Scene");
        assert!((result.confidence - 0.70).abs() < 1e-6);
    }

    #[test]
    fn dark_scene_row() {
        let result = classify(
            vec![0.1; COLOR_BINS],
            vec![0.0; EDGE_BINS],
            vec![0.0; TEXTURE_BINS],
        );
        assert_eq!(result.label, "Dark Scene");
        assert!((result.confidence - 0.70).abs() < 1e-6);
    }

    #[test]
    fn neutral_scene_row() {
        let result = classify(
            vec![0.5; COLOR_BINS],
            vec![0.0; EDGE_BINS],
            vec![0.0; TEXTURE_BINS],
        );
        assert_eq!(result.label, "Neutral Scene");
        assert!((result.confidence - 0.65).abs() < 1e-6);
    }

    #[test]
    fn rows_are_evaluated_top_to_bottom() {
        // Qualifies for both Edge-Rich and Color-Diverse; the earlier row
        // wins.
        let mut color = vec![0.0; COLOR_BINS];
        color[0] = 10.0;
        let result = classify(color, vec![0.4; EDGE_BINS], vec![0.0; TEXTURE_BINS]);
        assert_eq!(result.label, "Edge-Rich");
    }
}
