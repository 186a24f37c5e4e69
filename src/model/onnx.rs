use std::path::Path;

use ndarray::{Array4, CowArray};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch};
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};

use super::Classifier;
use crate::error::{Error, Result};

/// Runs an exported ONNX graph of the classifier. The graph takes an NHWC
/// float batch and ends in the softmax layer.
#[derive(Debug)]
pub struct OnnxClassifier {
    session: Session,
}

impl OnnxClassifier {
    pub fn load(model_path: &Path, cuda: bool) -> Result<Self> {
        if !model_path.is_file() {
            return Err(Error::WeightsNotFound(model_path.to_path_buf()));
        }

        let provider: ExecutionProviderDispatch = if cuda {
            CUDAExecutionProvider::default().build().error_on_failure()
        } else {
            CPUExecutionProvider::default().build()
        };
        tracing::info!(path = %model_path.display(), cuda, "creating ONNX session");

        let session = SessionBuilder::new()?
            .with_execution_providers([provider])?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_file(model_path)?;
        Ok(Self { session })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn predict(&self, batch: &Array4<f32>) -> Result<Vec<f32>> {
        let xs = CowArray::from(batch.view().into_dyn());
        let ys = self.session.run(ort::inputs![xs.view()]?)?;
        let (_, output) = ys
            .iter()
            .next()
            .ok_or_else(|| Error::Inference("model produced no outputs".to_string()))?;
        let probabilities = output.try_extract_tensor::<f32>()?;

        // Rows after the first belong to other batch items.
        let width = probabilities.shape().last().copied().unwrap_or(0);
        Ok(probabilities.iter().take(width).copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_graph_is_reported_before_session_setup() {
        let dir = tempfile::tempdir().unwrap();
        let result = OnnxClassifier::load(&dir.path().join("absent.onnx"), false);
        assert!(matches!(result, Err(Error::WeightsNotFound(_))));
    }
}
