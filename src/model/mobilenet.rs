use burn::{
    nn::{
        BatchNorm, BatchNormConfig, PaddingConfig2d,
        conv::{Conv2d, Conv2dConfig},
    },
    prelude::*,
};

/// Batch norm epsilon of the Keras MobileNetV2.
const BN_EPSILON: f64 = 1e-3;

/// Output channels of the final 1x1 convolution.
pub const FEATURES: usize = 1280;

/// (expansion, output channels, repeats, first stride) per stage.
const INVERTED_RESIDUAL_SETTINGS: [(usize, usize, usize, usize); 7] = [
    (1, 16, 1, 1),
    (6, 24, 2, 2),
    (6, 32, 3, 2),
    (6, 64, 4, 2),
    (6, 96, 3, 1),
    (6, 160, 3, 2),
    (6, 320, 1, 1),
];

/// Zero padding (before, after) that TensorFlow's "same" mode adds along one
/// spatial axis. Even inputs to a stride-2 layer are padded after only.
pub fn same_padding(size: usize, kernel: usize, stride: usize) -> (usize, usize) {
    let total = match size % stride {
        0 => kernel.saturating_sub(stride),
        rem => kernel.saturating_sub(rem),
    };
    (total / 2, total - total / 2)
}

/// Convolution followed by batch norm and an optional ReLU6.
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    norm: BatchNorm<B, 2>,
    kernel: usize,
    stride: usize,
    relu6: bool,
}

impl<B: Backend> ConvBlock<B> {
    pub fn new(
        c1: usize,
        c2: usize,
        k: usize,
        s: usize,
        groups: usize,
        relu6: bool,
        device: &B::Device,
    ) -> Self {
        // Strided layers pad in `forward`, where the input size is known.
        let padding = match s {
            1 => PaddingConfig2d::Explicit((k - 1) / 2, (k - 1) / 2),
            _ => PaddingConfig2d::Valid,
        };
        let conv = Conv2dConfig::new([c1, c2], [k, k])
            .with_stride([s, s])
            .with_groups(groups)
            .with_bias(false)
            .with_padding(padding)
            .init(device);
        let norm = BatchNormConfig::new(c2).with_epsilon(BN_EPSILON).init(device);
        Self {
            conv,
            norm,
            kernel: k,
            stride: s,
            relu6,
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let input = if self.stride > 1 {
            let [_, _, h, w] = input.dims();
            let (top, bottom) = same_padding(h, self.kernel, self.stride);
            let (left, right) = same_padding(w, self.kernel, self.stride);
            input.pad((left, right, top, bottom), 0.0)
        } else {
            input
        };
        let x = self.conv.forward(input);
        let x = self.norm.forward(x);
        if self.relu6 { x.clamp(0.0, 6.0) } else { x }
    }
}

#[derive(Module, Debug)]
pub struct InvertedResidual<B: Backend> {
    expand: Option<ConvBlock<B>>,
    depthwise: ConvBlock<B>,
    project: ConvBlock<B>,
    residual: bool,
}

impl<B: Backend> InvertedResidual<B> {
    pub fn new(c1: usize, c2: usize, stride: usize, expansion: usize, device: &B::Device) -> Self {
        let hidden = c1 * expansion;
        let expand = (expansion != 1).then(|| ConvBlock::new(c1, hidden, 1, 1, 1, true, device));
        let depthwise = ConvBlock::new(hidden, hidden, 3, stride, hidden, true, device);
        let project = ConvBlock::new(hidden, c2, 1, 1, 1, false, device);
        Self {
            expand,
            depthwise,
            project,
            residual: stride == 1 && c1 == c2,
        }
    }

    pub fn forward(&self, input: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = match &self.expand {
            Some(expand) => expand.forward(input.clone()),
            None => input.clone(),
        };
        let x = self.depthwise.forward(x);
        let x = self.project.forward(x);
        if self.residual { x + input } else { x }
    }
}

/// MobileNetV2 feature extractor without the classification top.
#[derive(Module, Debug)]
pub struct MobileNetV2<B: Backend> {
    stem: ConvBlock<B>,
    blocks: Vec<InvertedResidual<B>>,
    head: ConvBlock<B>,
}

impl<B: Backend> MobileNetV2<B> {
    pub fn new(device: &B::Device) -> Self {
        let stem = ConvBlock::new(3, 32, 3, 2, 1, true, device);

        let mut blocks = Vec::new();
        let mut c1 = 32;
        for (expansion, c2, repeats, stride) in INVERTED_RESIDUAL_SETTINGS {
            for i in 0..repeats {
                let s = if i == 0 { stride } else { 1 };
                blocks.push(InvertedResidual::new(c1, c2, s, expansion, device));
                c1 = c2;
            }
        }

        let head = ConvBlock::new(c1, FEATURES, 1, 1, 1, true, device);
        Self { stem, blocks, head }
    }

    /// # Shapes
    ///   - Images [batch_size, 3, height, width]
    ///   - Output [batch_size, 1280, height / 32, width / 32]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = self.stem.forward(images);
        for block in &self.blocks {
            x = block.forward(x);
        }
        self.head.forward(x)
    }
}
