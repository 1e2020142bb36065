//! Optional external feature model backed by ONNX Runtime.

use std::path::Path;

use image::imageops::FilterType;
use ndarray::Array4;
use ort::session::Session;
use ort::value::Tensor;

use crate::raster::PixelBuffer;
use crate::types::{ClassifyError, ClassifyResult};

/// Capability interface for an external descriptor source. The core never
/// interprets how the vector was produced, only its length and values.
/// Injected into the classifier so tests can stub it deterministically.
pub trait FeatureModel: Send {
    /// Produce a fixed-length descriptor for an image, or fail. Failures
    /// degrade the caller to hand-crafted extraction.
    fn extract(&mut self, image: &PixelBuffer) -> ClassifyResult<Vec<f32>>;
}

/// Model input edge length.
const MODEL_INPUT_SIZE: u32 = 224;

/// ImageNet channel statistics used by MobileNet-family feature models.
const INPUT_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const INPUT_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Feature extractor backed by a local ONNX model that maps a 224x224 RGB
/// image to a feature vector.
#[derive(Debug)]
pub struct OnnxFeatureModel {
    session: Session,
}

impl OnnxFeatureModel {
    /// Load a model from disk. A missing or unloadable file is a `Model`
    /// error; callers are expected to degrade to hand-crafted features.
    pub fn load(path: impl AsRef<Path>) -> ClassifyResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ClassifyError::Model(format!(
                "model not found at {}",
                path.display()
            )));
        }

        tracing::info!("loading feature model from {}", path.display());
        let session = Session::builder()
            .and_then(|b| Ok(b.with_intra_threads(1)?))
            .and_then(|mut b| b.commit_from_file(path))
            .map_err(|e| ClassifyError::Model(format!("failed to load ONNX model: {e}")))?;

        Ok(Self { session })
    }
}

impl FeatureModel for OnnxFeatureModel {
    fn extract(&mut self, image: &PixelBuffer) -> ClassifyResult<Vec<f32>> {
        // Preprocess: resize to 224x224, per-channel mean/std normalization.
        let rgb = image::DynamicImage::ImageRgba8(image.to_image())
            .resize_exact(MODEL_INPUT_SIZE, MODEL_INPUT_SIZE, FilterType::Lanczos3)
            .to_rgb8();

        // NCHW tensor [1, 3, 224, 224]
        let mut tensor = Array4::<f32>::zeros((
            1,
            3,
            MODEL_INPUT_SIZE as usize,
            MODEL_INPUT_SIZE as usize,
        ));
        for y in 0..MODEL_INPUT_SIZE {
            for x in 0..MODEL_INPUT_SIZE {
                let pixel = rgb.get_pixel(x, y);
                for c in 0..3usize {
                    let v = pixel[c] as f32 / 255.0;
                    tensor[[0, c, y as usize, x as usize]] = (v - INPUT_MEAN[c]) / INPUT_STD[c];
                }
            }
        }

        let input = Tensor::from_array(tensor)
            .map_err(|e| ClassifyError::Model(format!("failed to build input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| ClassifyError::Model(format!("inference failed: {e}")))?;

        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifyError::Model(format!("failed to read model output: {e}")))?;

        // L2 normalize so cosine similarity is well behaved.
        let mut descriptor: Vec<f32> = data.to_vec();
        let norm: f32 = descriptor.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in descriptor.iter_mut() {
                *v /= norm;
            }
        }
        Ok(descriptor)
    }
}
