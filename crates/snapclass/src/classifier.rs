//! Classification service: extraction, knowledge lookup, heuristic fallback.

use crate::features::{extract_features, FeatureVector};
use crate::heuristic::heuristic_classify;
use crate::model::FeatureModel;
use crate::raster::PixelBuffer;
use crate::similarity::best_match;
use crate::types::{
    unix_now, BestMatch, ClassificationResult, ClassifierSource, ClassifyError, ClassifyResult,
    DescriptorKind, KnowledgeStore, LabeledExample,
};

/// A descriptor together with the stage that produced it.
enum Descriptor {
    Model(Vec<f32>),
    Handcrafted(FeatureVector),
}

impl Descriptor {
    fn values(&self) -> &[f32] {
        match self {
            Descriptor::Model(v) => v,
            Descriptor::Handcrafted(f) => f.as_slice(),
        }
    }

    fn kind(&self) -> DescriptorKind {
        match self {
            Descriptor::Model(_) => DescriptorKind::Model,
            Descriptor::Handcrafted(_) => DescriptorKind::Handcrafted,
        }
    }
}

/// Orchestrates the classification chain: model-or-handcrafted extraction,
/// nearest-neighbor lookup, heuristic fallback. Holds the optional external
/// model as an injected capability; the knowledge store stays owned by the
/// caller.
#[derive(Default)]
pub struct Classifier {
    model: Option<Box<dyn FeatureModel>>,
}

impl Classifier {
    /// A classifier using hand-crafted features only.
    pub fn new() -> Self {
        Self { model: None }
    }

    /// A classifier that prefers the given feature model and degrades to
    /// hand-crafted features when it fails.
    pub fn with_model(model: Box<dyn FeatureModel>) -> Self {
        Self { model: Some(model) }
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Preferred descriptor for an image. Model failures and empty model
    /// outputs are absorbed here (logged, never surfaced); an undersized
    /// buffer aborts the request.
    fn extract(&mut self, image: &PixelBuffer) -> ClassifyResult<Descriptor> {
        if let Some(model) = self.model.as_mut() {
            match model.extract(image) {
                Ok(v) if !v.is_empty() => return Ok(Descriptor::Model(v)),
                Ok(_) => {
                    tracing::warn!("feature model returned an empty vector, using hand-crafted features");
                }
                Err(e) => {
                    tracing::warn!("feature model failed ({e}), using hand-crafted features");
                }
            }
        }
        Ok(Descriptor::Handcrafted(extract_features(image)?))
    }

    /// Classify one image against the knowledge store.
    ///
    /// The store is scanned for the nearest stored exemplar; when the store
    /// is empty or no exemplar yields a positive similarity, the heuristic
    /// table answers instead. Always produces a result for a usable buffer.
    pub fn classify(
        &mut self,
        image: &PixelBuffer,
        store: &KnowledgeStore,
    ) -> ClassifyResult<ClassificationResult> {
        image.require_interior()?;
        let descriptor = self.extract(image)?;

        match best_match(descriptor.values(), store) {
            BestMatch::Found { label, score } if score > 0.0 => {
                let source = match descriptor.kind() {
                    DescriptorKind::Model => ClassifierSource::Model,
                    DescriptorKind::Handcrafted => ClassifierSource::Handcrafted,
                };
                Ok(ClassificationResult {
                    label,
                    confidence: score.clamp(0.0, 1.0),
                    source,
                })
            }
            _ => {
                tracing::debug!("no usable match in knowledge store, using heuristic fallback");
                let features = match descriptor {
                    Descriptor::Handcrafted(f) => f,
                    Descriptor::Model(_) => extract_features(image)?,
                };
                Ok(heuristic_classify(&features))
            }
        }
    }

    /// Extract descriptors for the given images and append them to the
    /// store under `label`. Returns the number of stored examples.
    ///
    /// All-or-nothing: every image is validated and extracted before the
    /// first append, so a failing image leaves the store untouched.
    pub fn train(
        &mut self,
        store: &mut KnowledgeStore,
        label: &str,
        images: &[PixelBuffer],
    ) -> ClassifyResult<usize> {
        if label.trim().is_empty() {
            return Err(ClassifyError::InvalidInput(
                "label must be non-empty".to_string(),
            ));
        }

        let mut pending = Vec::with_capacity(images.len());
        for image in images {
            image.require_interior()?;
            let descriptor = self.extract(image)?;
            let kind = descriptor.kind();
            let values = match descriptor {
                Descriptor::Model(v) => v,
                Descriptor::Handcrafted(f) => f.into_vec(),
            };
            pending.push(LabeledExample {
                descriptor: values,
                kind,
                image: image.clone(),
                trained_at: unix_now(),
            });
        }

        let count = pending.len();
        for example in pending {
            store.insert(label, example)?;
            tracing::debug!(label, "stored training example");
        }
        Ok(count)
    }
}
