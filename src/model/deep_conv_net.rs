//! DeepConvNet: a stack of conv / batch-norm / max-pool stages
//!
//! The first stage convolves over time and then across electrodes; every later
//! stage only convolves over time. Each stage shortens the time axis by
//! `floor((len - 4) / 2)` (valid 1x5 conv followed by a 1x2 max-pool).

use burn::{
    config::Config,
    module::{Ignored, Module},
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig,
    },
    tensor::{backend::Backend, Tensor},
};

use super::{activation::Activation, EegClassifier};
use crate::utils::error::{LabError, Result as LabResult};

const TEMPORAL_KERNEL: usize = 5;
const POOL: usize = 2;

/// Configuration for [`DeepConvNet`]
#[derive(Config, Debug)]
pub struct DeepConvNetConfig {
    #[config(default = "Activation::Elu")]
    pub activation: Activation,

    #[config(default = "0.5")]
    pub dropout: f64,

    /// Output channels of every stage, in order
    #[config(default = "vec![25, 50, 100, 200]")]
    pub stage_widths: Vec<usize>,

    #[config(default = "2")]
    pub electrodes: usize,

    #[config(default = "750")]
    pub time_samples: usize,

    #[config(default = "2")]
    pub num_classes: usize,
}

/// Time length after `stages` conv/pool stages
///
/// Fails when a stage would receive fewer samples than its kernel can reduce
/// to a non-empty output.
pub fn reduced_length(time_samples: usize, stages: usize) -> LabResult<usize> {
    (0..stages).try_fold(time_samples, |len, stage| {
        match len.checked_sub(TEMPORAL_KERNEL - 1).map(|conv| conv / POOL) {
            Some(next) if next > 0 => Ok(next),
            _ => Err(LabError::Model(format!(
                "DeepConvNet stage {} receives {} time samples, needs at least {}",
                stage,
                len,
                TEMPORAL_KERNEL + 1
            ))),
        }
    })
}

impl DeepConvNetConfig {
    /// Features entering the classifier: last width * (electrodes - 1) * reduced length
    pub fn flatten_size(&self) -> LabResult<usize> {
        let last = *self
            .stage_widths
            .last()
            .ok_or_else(|| LabError::Config("DeepConvNet needs at least one stage".to_string()))?;
        let length = reduced_length(self.time_samples, self.stage_widths.len())?;
        Ok(last * self.electrodes.saturating_sub(1) * length)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> LabResult<DeepConvNet<B>> {
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(LabError::Config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.electrodes < 2 {
            return Err(LabError::Config(format!(
                "DeepConvNet needs at least 2 electrodes, got {}",
                self.electrodes
            )));
        }
        let flatten_size = self.flatten_size()?;

        let mut stages = Vec::with_capacity(self.stage_widths.len());
        let mut in_channels = 1;
        for (index, &width) in self.stage_widths.iter().enumerate() {
            stages.push(ConvStage::new(in_channels, width, index == 0, self, device));
            in_channels = width;
        }

        Ok(DeepConvNet {
            stages,
            classify: LinearConfig::new(flatten_size, self.num_classes).init(device),
            flatten_size,
        })
    }
}

/// One conv / batch-norm / activation / pool / dropout block
#[derive(Module, Debug)]
pub struct ConvStage<B: Backend> {
    conv: Conv2d<B>,
    /// Electrode-mixing conv, first stage only
    spatial_conv: Option<Conv2d<B>>,
    bn: BatchNorm<B>,
    pool: MaxPool2d,
    dropout: Dropout,
    activation: Ignored<Activation>,
}

impl<B: Backend> ConvStage<B> {
    fn new(
        in_channels: usize,
        width: usize,
        spatial: bool,
        config: &DeepConvNetConfig,
        device: &B::Device,
    ) -> Self {
        let conv = Conv2dConfig::new([in_channels, width], [1, TEMPORAL_KERNEL]).init(device);
        let spatial_conv = spatial.then(|| Conv2dConfig::new([width, width], [2, 1]).init(device));

        Self {
            conv,
            spatial_conv,
            bn: BatchNormConfig::new(width)
                .with_epsilon(1e-5)
                .with_momentum(0.1)
                .init(device),
            pool: MaxPool2dConfig::new([1, POOL])
                .with_strides([1, POOL])
                .init(),
            dropout: DropoutConfig::new(config.dropout).init(),
            activation: Ignored(config.activation),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut x = self.conv.forward(x);
        if let Some(spatial) = &self.spatial_conv {
            x = spatial.forward(x);
        }
        let x = self.bn.forward(x);
        let x = self.activation.apply(x);
        let x = self.pool.forward(x);
        self.dropout.forward(x)
    }
}

/// DeepConvNet classifier
#[derive(Module, Debug)]
pub struct DeepConvNet<B: Backend> {
    stages: Vec<ConvStage<B>>,
    classify: Linear<B>,
    flatten_size: usize,
}

impl<B: Backend> DeepConvNet<B> {
    /// Forward pass: [batch, 1, electrodes, time] -> [batch, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> LabResult<Tensor<B, 2>> {
        let x = self.stages.iter().fold(x, |x, stage| stage.forward(x));

        let [batch, channels, height, width] = x.dims();
        let features = channels * height * width;
        if features != self.flatten_size {
            return Err(LabError::ShapeMismatch {
                context: "DeepConvNet classifier".to_string(),
                expected: self.flatten_size,
                actual: features,
            });
        }

        Ok(self.classify.forward(x.reshape([batch, features])))
    }

    pub fn num_stages(&self) -> usize {
        self.stages.len()
    }
}

impl<B: Backend> EegClassifier<B> for DeepConvNet<B> {
    fn classify(&self, x: Tensor<B, 4>) -> LabResult<Tensor<B, 2>> {
        self.forward(x)
    }

    fn flatten_size(&self) -> usize {
        self.flatten_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_reduced_length_matches_pooling_arithmetic() {
        assert_eq!(reduced_length(750, 1).unwrap(), 373);
        assert_eq!(reduced_length(750, 4).unwrap(), 43);
        assert_eq!(reduced_length(750, 0).unwrap(), 750);
    }

    #[test]
    fn test_flatten_size_default() {
        assert_eq!(DeepConvNetConfig::new().flatten_size().unwrap(), 200 * 43);
    }

    #[test]
    fn test_underflowing_stage_list_rejected() {
        // 750 -> 373 -> 184 -> 90 -> 43 -> 19 -> 7 -> 1 -> underflow
        assert_eq!(reduced_length(750, 7).unwrap(), 1);
        assert!(reduced_length(750, 8).is_err());

        let device = Default::default();
        let result = DeepConvNetConfig::new()
            .with_stage_widths(vec![4; 8])
            .init::<TestBackend>(&device);
        assert!(matches!(result, Err(LabError::Model(_))));
    }

    #[test]
    fn test_empty_stage_list_rejected() {
        let config = DeepConvNetConfig::new().with_stage_widths(vec![]);
        assert!(matches!(config.flatten_size(), Err(LabError::Config(_))));
    }

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let model = DeepConvNetConfig::new()
            .with_stage_widths(vec![4, 8])
            .with_time_samples(40)
            .init::<TestBackend>(&device)
            .unwrap();

        // 40 -> 18 -> 7
        assert_eq!(model.flatten_size(), 8 * 7);
        assert_eq!(model.num_stages(), 2);

        let input = Tensor::<TestBackend, 4>::zeros([2, 1, 2, 40], &device);
        assert_eq!(model.forward(input).unwrap().dims(), [2, 2]);
    }

    #[test]
    fn test_wrong_time_length_is_shape_mismatch() {
        let device = Default::default();
        let model = DeepConvNetConfig::new()
            .with_stage_widths(vec![4, 8])
            .with_time_samples(40)
            .init::<TestBackend>(&device)
            .unwrap();

        let input = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 60], &device);
        assert!(matches!(
            model.forward(input),
            Err(LabError::ShapeMismatch { .. })
        ));
    }
}
