//! Core data types for labeled exemplars and classification results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::raster::PixelBuffer;

/// How a stored descriptor was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorKind {
    /// Hand-crafted color/edge/texture histogram descriptor.
    Handcrafted,
    /// Vector produced by an external feature model.
    Model,
}

/// One stored training example: a label's descriptor plus the raster it
/// was extracted from, kept for redisplay. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledExample {
    pub descriptor: Vec<f32>,
    pub kind: DescriptorKind,
    pub image: PixelBuffer,
    pub trained_at: u64,
}

/// Which stage of the fallback chain produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierSource {
    /// External feature model matched against the knowledge store.
    Model,
    /// Hand-crafted descriptor matched against the knowledge store.
    Handcrafted,
    /// Rule-based fallback; no exemplars were usable.
    Heuristic,
}

impl std::fmt::Display for ClassifierSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClassifierSource::Model => "model",
            ClassifierSource::Handcrafted => "handcrafted",
            ClassifierSource::Heuristic => "heuristic",
        };
        f.write_str(name)
    }
}

/// A single classification verdict. Created fresh per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    /// Similarity or table confidence in `[0, 1]`.
    pub confidence: f32,
    pub source: ClassifierSource,
}

/// Outcome of a nearest-neighbor scan. An empty store is distinct from a
/// zero-confidence match, so callers cannot confuse the two.
#[derive(Debug, Clone, PartialEq)]
pub enum BestMatch {
    Found { label: String, score: f32 },
    Empty,
}

/// In-memory knowledge store: label → insertion-ordered examples.
///
/// Label keys are kept in lexical order, which gives the nearest-neighbor
/// scan its deterministic tie-break. A key exists iff it holds at least
/// one example; removing the last example removes the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeStore {
    labels: BTreeMap<String, Vec<LabeledExample>>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl KnowledgeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        let now = unix_now();
        Self {
            labels: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append an example under a label, creating the label if needed.
    /// Labels are trimmed; an empty label is rejected.
    pub fn insert(&mut self, label: &str, example: LabeledExample) -> ClassifyResult<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ClassifyError::InvalidInput(
                "label must be non-empty".to_string(),
            ));
        }
        self.labels.entry(label.to_string()).or_default().push(example);
        self.touch();
        Ok(())
    }

    /// Examples stored under a label, in insertion order.
    pub fn examples(&self, label: &str) -> Option<&[LabeledExample]> {
        self.labels.get(label).map(|v| v.as_slice())
    }

    /// All labels in lexical order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(|s| s.as_str())
    }

    /// Iterate (label, examples) pairs in lexical label order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[LabeledExample])> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn contains_label(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Remove a label and all of its examples. Returns whether it existed.
    /// The label is trimmed, matching `insert`.
    pub fn remove_label(&mut self, label: &str) -> bool {
        let removed = self.labels.remove(label.trim()).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Remove a single example by insertion index. Removing the last
    /// example of a label removes the label key as well. The label is
    /// trimmed, matching `insert`.
    pub fn remove_example(&mut self, label: &str, index: usize) -> bool {
        let label = label.trim();
        let Some(examples) = self.labels.get_mut(label) else {
            return false;
        };
        if index >= examples.len() {
            return false;
        }
        examples.remove(index);
        if examples.is_empty() {
            self.labels.remove(label);
        }
        self.touch();
        true
    }

    /// Number of distinct labels.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Total number of stored examples across all labels.
    pub fn example_count(&self) -> usize {
        self.labels.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn touch(&mut self) {
        self.updated_at = unix_now();
    }
}

impl Default for KnowledgeStore {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Errors that can occur in the classification core.
#[derive(thiserror::Error, Debug)]
pub enum ClassifyError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Extractors need a 1-pixel interior border.
    #[error("buffer too small: {width}x{height}, extractors need at least 3x3")]
    BufferTooSmall { width: u32, height: u32 },

    #[error("model error: {0}")]
    Model(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type.
pub type ClassifyResult<T> = Result<T, ClassifyError>;
