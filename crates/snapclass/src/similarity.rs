//! Cosine similarity and nearest-neighbor lookup over the knowledge store.

use crate::types::{BestMatch, KnowledgeStore};

/// Compute cosine similarity between two vectors.
///
/// Returns 0 for empty inputs, mismatched lengths, or a zero-norm side.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// One-vs-all nearest-neighbor scan: every example of every label, tracking
/// the single best (label, score) pair. Descriptors of differing
/// dimensionality are truncated to the shorter length before comparison.
///
/// Labels are visited in lexical order and an incumbent is only replaced by
/// a strictly greater score, so ties resolve to the lexically first label
/// and, within a label, to the earliest-inserted example.
pub fn best_match(query: &[f32], store: &KnowledgeStore) -> BestMatch {
    let mut best: Option<(&str, f32)> = None;

    for (label, examples) in store.iter() {
        for example in examples {
            if example.descriptor.is_empty() {
                continue;
            }
            let n = query.len().min(example.descriptor.len());
            let score = cosine_similarity(&query[..n], &example.descriptor[..n]);
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((label, score)),
            }
        }
    }

    match best {
        Some((label, score)) => BestMatch::Found {
            label: label.to_string(),
            score,
        },
        None => BestMatch::Empty,
    }
}
