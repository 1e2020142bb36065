//! snapclass — trainable on-device image classification: hand-crafted
//! histogram descriptors, nearest-neighbor similarity over a labeled
//! knowledge store, and a deterministic heuristic fallback.

pub mod classifier;
pub mod features;
pub mod heuristic;
pub mod model;
pub mod raster;
pub mod similarity;
pub mod storage;
pub mod types;

pub use classifier::Classifier;
pub use features::{
    extract_features, FeatureVector, COLOR_BINS, EDGE_BINS, FEATURE_DIM, TEXTURE_BINS,
};
pub use heuristic::heuristic_classify;
pub use model::{FeatureModel, OnnxFeatureModel};
pub use raster::{is_supported_format, PixelBuffer, MIN_DIMENSION};
pub use similarity::{best_match, cosine_similarity};
pub use storage::{KnowledgeReader, KnowledgeWriter};
pub use types::*;
