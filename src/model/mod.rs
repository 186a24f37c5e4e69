pub mod mobilenet;
pub mod network;
pub mod onnx;

use std::path::Path;
use std::sync::Arc;

use clap::ValueEnum;
use ndarray::Array4;

use crate::error::{Error, Result};
use crate::preprocess::PreprocessConfig;

pub use network::{BurnClassifier, ToolNet};
pub use onnx::OnnxClassifier;

/// A loaded image classifier.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs an NHWC batch and returns the class probabilities of its first
    /// image.
    fn predict(&self, batch: &Array4<f32>) -> Result<Vec<f32>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelBackend {
    /// MobileNetV2 topology rebuilt in burn, weights from a `.mpk` record
    Burn,
    /// Exported ONNX graph run through onnxruntime
    Onnx,
}

/// Loads the classifier and checks that it predicts exactly `num_classes`
/// probabilities.
pub fn load_classifier(
    backend: ModelBackend,
    weights: &Path,
    num_classes: usize,
    input: &PreprocessConfig,
    cuda: bool,
) -> Result<Arc<dyn Classifier>> {
    let classifier: Arc<dyn Classifier> = match backend {
        ModelBackend::Burn => Arc::new(BurnClassifier::load(weights, num_classes)?),
        ModelBackend::Onnx => Arc::new(OnnxClassifier::load(weights, cuda)?),
    };
    verify_output_width(classifier.as_ref(), num_classes, input)?;
    Ok(classifier)
}

/// Dry run on a blank batch.
pub fn verify_output_width(
    classifier: &dyn Classifier,
    num_classes: usize,
    input: &PreprocessConfig,
) -> Result<()> {
    let blank = Array4::zeros((1, input.height, input.width, input.channels));
    let outputs = classifier.predict(&blank)?.len();
    if outputs != num_classes {
        return Err(Error::IncompatibleWeights(format!(
            "{} model predicts {outputs} classes but the class index has {num_classes}",
            classifier.name()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(usize);

    impl Classifier for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn predict(&self, _batch: &Array4<f32>) -> Result<Vec<f32>> {
            Ok(vec![1.0 / self.0 as f32; self.0])
        }
    }

    #[test]
    fn output_width_must_match_classes() {
        let input = PreprocessConfig::default();
        assert!(verify_output_width(&Fixed(4), 4, &input).is_ok());
        assert!(matches!(
            verify_output_width(&Fixed(3), 4, &input),
            Err(Error::IncompatibleWeights(_))
        ));
    }

    #[test]
    fn burn_weights_load_and_verify() {
        use burn::module::Module;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.mpk");
        let device = Default::default();
        ToolNet::<network::CpuBackend>::new(3, &device)
            .save_file(path.clone(), &network::WeightsRecorder::new())
            .unwrap();

        let loaded = load_classifier(ModelBackend::Burn, &path, 3, &PreprocessConfig::default(), false);
        assert!(loaded.is_ok());
    }
}
