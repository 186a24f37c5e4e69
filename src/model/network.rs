use std::path::Path;
use std::sync::Mutex;

use burn::{
    backend::NdArray,
    nn::{
        Dropout, DropoutConfig, Linear, LinearConfig, Relu,
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
    },
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder},
    tensor::{TensorData, activation::softmax},
};
use ndarray::Array4;

use super::Classifier;
use super::mobilenet::{FEATURES, MobileNetV2};
use crate::error::{Error, Result};

pub type CpuBackend = NdArray<f32>;

pub const HIDDEN_UNITS: usize = 128;
pub const DROPOUT: f64 = 0.5;

/// Weight records are named MessagePack files.
pub type WeightsRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// MobileNetV2 backbone with a small dense classification head.
#[derive(Module, Debug)]
pub struct ToolNet<B: Backend> {
    backbone: MobileNetV2<B>,
    pool: AdaptiveAvgPool2d,
    hidden: Linear<B>,
    activation: Relu,
    dropout: Dropout,
    output: Linear<B>,
}

impl<B: Backend> ToolNet<B> {
    /// Create the network with randomly initialized weights.
    pub fn new(num_classes: usize, device: &B::Device) -> Self {
        Self {
            backbone: MobileNetV2::new(device),
            pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            hidden: LinearConfig::new(FEATURES, HIDDEN_UNITS).init(device),
            activation: Relu::new(),
            dropout: DropoutConfig::new(DROPOUT).init(),
            output: LinearConfig::new(HIDDEN_UNITS, num_classes).init(device),
        }
    }

    /// # Shapes
    ///   - Images [batch_size, 3, height, width]
    ///   - Output [batch_size, num_classes], rows sum to 1
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.backbone.forward(images);
        let x = self.pool.forward(x).flatten::<2>(1, 3);
        let x = self.activation.forward(self.hidden.forward(x));
        let x = self.dropout.forward(x);
        softmax(self.output.forward(x), 1)
    }

    /// Loads weights saved for this exact topology. Only `.mpk` records are
    /// accepted; the recorder would otherwise swap the extension silently.
    pub fn load_weights(self, path: &Path, device: &B::Device) -> Result<Self> {
        if path.extension().is_none_or(|ext| ext != "mpk") {
            return Err(Error::WeightsFormat(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(Error::WeightsNotFound(path.to_path_buf()));
        }

        let expected = self.num_params();
        let model = self
            .load_file(path, &WeightsRecorder::new(), device)
            .map_err(|e| Error::IncompatibleWeights(format!("{e:?}")))?;
        let loaded = model.num_params();
        if loaded != expected {
            return Err(Error::IncompatibleWeights(format!(
                "record holds {loaded} parameters, topology expects {expected}"
            )));
        }
        Ok(model)
    }
}

/// Runs [`ToolNet`] on the CPU.
#[derive(Debug)]
pub struct BurnClassifier {
    model: Mutex<ToolNet<CpuBackend>>,
    device: <CpuBackend as Backend>::Device,
}

impl BurnClassifier {
    pub fn new(model: ToolNet<CpuBackend>) -> Self {
        Self {
            model: Mutex::new(model),
            device: Default::default(),
        }
    }

    /// Rebuilds the topology for `num_classes` and fills it from `weights`.
    pub fn load(weights: &Path, num_classes: usize) -> Result<Self> {
        let device = Default::default();
        tracing::info!(num_classes, "building MobileNetV2 classifier");
        let model = ToolNet::<CpuBackend>::new(num_classes, &device).load_weights(weights, &device)?;
        Ok(Self::new(model))
    }
}

impl Classifier for BurnClassifier {
    fn name(&self) -> &'static str {
        "burn"
    }

    fn predict(&self, batch: &Array4<f32>) -> Result<Vec<f32>> {
        let (n, h, w, c) = batch.dim();
        let data = TensorData::new(batch.iter().copied().collect::<Vec<f32>>(), [n, h, w, c]);
        // NHWC -> NCHW
        let images = Tensor::<CpuBackend, 4>::from_data(data, &self.device).permute([0, 3, 1, 2]);

        let model = self
            .model
            .lock()
            .map_err(|_| Error::Inference("model lock poisoned".to_string()))?;
        let probabilities = model.forward(images).slice([0..1]);
        probabilities
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| Error::Inference(format!("{e:?}")))
    }
}
