//! EEGNet: a compact depthwise-separable CNN for two-class EEG decoding
//!
//! Three fixed stages (temporal conv, depthwise spatial conv, separable conv)
//! followed by a linear classifier. The flatten size is derived from the time
//! length and the two average-pooling strides, not measured at runtime.

use burn::{
    config::Config,
    module::{Ignored, Module},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AvgPool2d, AvgPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
        PaddingConfig2d,
    },
    tensor::{backend::Backend, Tensor},
};

use super::{activation::Activation, EegClassifier};
use crate::utils::error::{LabError, Result as LabResult};

const TEMPORAL_FILTERS: usize = 16;
const DEPTHWISE_FILTERS: usize = 32;
const TEMPORAL_KERNEL: usize = 51;
const SEPARABLE_KERNEL: usize = 15;
const FIRST_POOL: usize = 4;
const SECOND_POOL: usize = 8;

/// Configuration for [`EegNet`]
#[derive(Config, Debug)]
pub struct EegNetConfig {
    /// Nonlinearity after the depthwise and separable stages
    #[config(default = "Activation::Elu")]
    pub activation: Activation,

    /// Dropout probability after each pooling layer
    #[config(default = "0.25")]
    pub dropout: f64,

    /// Number of electrodes (input height)
    #[config(default = "2")]
    pub electrodes: usize,

    /// Number of time samples (input width)
    #[config(default = "750")]
    pub time_samples: usize,

    #[config(default = "2")]
    pub num_classes: usize,
}

impl EegNetConfig {
    /// Features entering the classifier: 32 * (electrodes - 1) * (time / 4 / 8)
    pub fn flatten_size(&self) -> usize {
        let time = self.time_samples / FIRST_POOL / SECOND_POOL;
        DEPTHWISE_FILTERS * self.electrodes.saturating_sub(1) * time
    }

    /// Build the network, failing if the derived flatten size is empty
    pub fn init<B: Backend>(&self, device: &B::Device) -> LabResult<EegNet<B>> {
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(LabError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        let flatten_size = self.flatten_size();
        if flatten_size == 0 {
            return Err(LabError::Model(format!(
                "EEGNet needs at least 2 electrodes and {} time samples, got {}x{}",
                FIRST_POOL * SECOND_POOL,
                self.electrodes,
                self.time_samples
            )));
        }

        let first_conv = Conv2dConfig::new([1, TEMPORAL_FILTERS], [1, TEMPORAL_KERNEL])
            .with_padding(PaddingConfig2d::Explicit(0, TEMPORAL_KERNEL / 2))
            .with_bias(false)
            .init(device);
        let depthwise_conv = Conv2dConfig::new([TEMPORAL_FILTERS, DEPTHWISE_FILTERS], [2, 1])
            .with_groups(TEMPORAL_FILTERS)
            .with_bias(false)
            .init(device);
        let separable_conv = Conv2dConfig::new([DEPTHWISE_FILTERS, DEPTHWISE_FILTERS], [1, SEPARABLE_KERNEL])
            .with_padding(PaddingConfig2d::Explicit(0, SEPARABLE_KERNEL / 2))
            .with_bias(false)
            .init(device);

        Ok(EegNet {
            first_conv,
            first_bn: batch_norm(TEMPORAL_FILTERS, device),
            depthwise_conv,
            depthwise_bn: batch_norm(DEPTHWISE_FILTERS, device),
            depthwise_pool: AvgPool2dConfig::new([1, FIRST_POOL])
                .with_strides([1, FIRST_POOL])
                .init(),
            depthwise_dropout: DropoutConfig::new(self.dropout).init(),
            separable_conv,
            separable_bn: batch_norm(DEPTHWISE_FILTERS, device),
            separable_pool: AvgPool2dConfig::new([1, SECOND_POOL])
                .with_strides([1, SECOND_POOL])
                .init(),
            separable_dropout: DropoutConfig::new(self.dropout).init(),
            classify: LinearConfig::new(flatten_size, self.num_classes).init(device),
            activation: Ignored(self.activation),
            flatten_size,
        })
    }
}

fn batch_norm<B: Backend>(channels: usize, device: &B::Device) -> BatchNorm<B> {
    BatchNormConfig::new(channels)
        .with_epsilon(1e-5)
        .with_momentum(0.1)
        .init(device)
}

/// EEGNet classifier
#[derive(Module, Debug)]
pub struct EegNet<B: Backend> {
    first_conv: Conv2d<B>,
    first_bn: BatchNorm<B>,

    depthwise_conv: Conv2d<B>,
    depthwise_bn: BatchNorm<B>,
    depthwise_pool: AvgPool2d,
    depthwise_dropout: Dropout,

    separable_conv: Conv2d<B>,
    separable_bn: BatchNorm<B>,
    separable_pool: AvgPool2d,
    separable_dropout: Dropout,

    classify: Linear<B>,

    activation: Ignored<Activation>,
    flatten_size: usize,
}

impl<B: Backend> EegNet<B> {
    /// Forward pass: [batch, 1, electrodes, time] -> [batch, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> LabResult<Tensor<B, 2>> {
        let x = self.first_conv.forward(x);
        let x = self.first_bn.forward(x);

        let x = self.depthwise_conv.forward(x);
        let x = self.depthwise_bn.forward(x);
        let x = self.activation.apply(x);
        let x = self.depthwise_pool.forward(x);
        let x = self.depthwise_dropout.forward(x);

        let x = self.separable_conv.forward(x);
        let x = self.separable_bn.forward(x);
        let x = self.activation.apply(x);
        let x = self.separable_pool.forward(x);
        let x = self.separable_dropout.forward(x);

        let [batch, channels, height, width] = x.dims();
        let features = channels * height * width;
        if features != self.flatten_size {
            return Err(LabError::ShapeMismatch {
                context: "EEGNet classifier".to_string(),
                expected: self.flatten_size,
                actual: features,
            });
        }

        Ok(self.classify.forward(x.reshape([batch, features])))
    }

    pub fn activation(&self) -> Activation {
        *self.activation
    }
}

impl<B: Backend> EegClassifier<B> for EegNet<B> {
    fn classify(&self, x: Tensor<B, 4>) -> LabResult<Tensor<B, 2>> {
        self.forward(x)
    }

    fn flatten_size(&self) -> usize {
        self.flatten_size
    }
}
