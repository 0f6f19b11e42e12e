//! Frozen multi-label classifier used to score generated images

use std::path::Path;

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig, MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    record::CompactRecorder,
    tensor::{activation::sigmoid, backend::Backend, Tensor},
};

use super::conditions::NUM_OBJECTS;
use crate::utils::error::{LabError, Result as LabResult};

/// Scores a batch of generated images against the conditions they were generated from
pub trait EvaluationModel<B: Backend> {
    /// Fraction of condition slots recovered, in [0, 1]
    fn eval(&self, images: Tensor<B, 4>, conditions: Tensor<B, 2>) -> LabResult<f32>;
}

/// Top-k accuracy for multi-label predictions
///
/// For each row `k` is the number of active label slots; a hit is a top-k
/// predicted slot that is active. Returns hits over total active slots, or 0
/// when no slot is active.
pub fn top_k_accuracy(scores: &[Vec<f32>], labels: &[Vec<f32>]) -> LabResult<f32> {
    if scores.len() != labels.len() {
        return Err(LabError::ShapeMismatch {
            context: "top-k accuracy rows".to_string(),
            expected: labels.len(),
            actual: scores.len(),
        });
    }

    let mut hits = 0usize;
    let mut total = 0usize;
    for (row_scores, row_labels) in scores.iter().zip(labels) {
        if row_scores.len() != row_labels.len() {
            return Err(LabError::ShapeMismatch {
                context: "top-k accuracy columns".to_string(),
                expected: row_labels.len(),
                actual: row_scores.len(),
            });
        }
        let k = row_labels.iter().filter(|v| **v > 0.5).count();
        total += k;

        let mut ranked: Vec<usize> = (0..row_scores.len()).collect();
        ranked.sort_by(|&a, &b| row_scores[b].total_cmp(&row_scores[a]));
        hits += ranked
            .iter()
            .take(k)
            .filter(|&&slot| row_labels[slot] > 0.5)
            .count();
    }

    if total == 0 {
        return Ok(0.0);
    }
    Ok(hits as f32 / total as f32)
}

/// Configuration for [`ConvEvaluator`]
#[derive(Config, Debug)]
pub struct ConvEvaluatorConfig {
    #[config(default = "3")]
    pub in_channels: usize,

    #[config(default = "32")]
    pub base_filters: usize,
}

impl ConvEvaluatorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConvEvaluator<B> {
        let base = self.base_filters;
        let widths = [base, base * 2, base * 4, base * 8];

        let mut blocks = Vec::with_capacity(widths.len());
        let mut in_channels = self.in_channels;
        for width in widths {
            blocks.push(ConvBlock::new(in_channels, width, device));
            in_channels = width;
        }

        ConvEvaluator {
            blocks,
            global_pool: AdaptiveAvgPool2dConfig::new([1, 1]).init(),
            head: LinearConfig::new(in_channels, NUM_OBJECTS).init(device),
        }
    }

    /// Build an evaluator and load its frozen weights
    pub fn load<B: Backend>(&self, path: &Path, device: &B::Device) -> LabResult<ConvEvaluator<B>> {
        self.init::<B>(device)
            .load_file(path.to_path_buf(), &CompactRecorder::new(), device)
            .map_err(|e| LabError::Checkpoint(path.to_path_buf(), format!("{:?}", e)))
    }
}

/// 3x3 conv, batch norm, ReLU, 2x2 max-pool
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    conv: Conv2d<B>,
    bn: BatchNorm<B>,
    relu: Relu,
    pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        Self {
            conv: Conv2dConfig::new([in_channels, out_channels], [3, 3])
                .with_padding(PaddingConfig2d::Same)
                .init(device),
            bn: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.relu.forward(self.bn.forward(self.conv.forward(x)));
        self.pool.forward(x)
    }
}

/// Multi-label CNN over generated images, one sigmoid output per object slot
#[derive(Module, Debug)]
pub struct ConvEvaluator<B: Backend> {
    blocks: Vec<ConvBlock<B>>,
    global_pool: AdaptiveAvgPool2d,
    head: Linear<B>,
}

impl<B: Backend> ConvEvaluator<B> {
    /// Per-slot probabilities `[n, 24]`
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.blocks.iter().fold(images, |x, block| block.forward(x));
        let x = self.global_pool.forward(x);
        let [batch, channels, _, _] = x.dims();
        sigmoid(self.head.forward(x.reshape([batch, channels])))
    }
}

impl<B: Backend> EvaluationModel<B> for ConvEvaluator<B> {
    fn eval(&self, images: Tensor<B, 4>, conditions: Tensor<B, 2>) -> LabResult<f32> {
        let scores = rows(self.forward(images))?;
        let labels = rows(conditions)?;
        top_k_accuracy(&scores, &labels)
    }
}

fn rows<B: Backend>(tensor: Tensor<B, 2>) -> LabResult<Vec<Vec<f32>>> {
    let [_, cols] = tensor.dims();
    let values: Vec<f32> = tensor
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| LabError::Model(format!("cannot read tensor: {:?}", e)))?;
    Ok(values.chunks(cols.max(1)).map(|c| c.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_top_k_accuracy_hand_computed() {
        let scores = vec![
            vec![0.9, 0.1, 0.8, 0.2],
            vec![0.1, 0.7, 0.6, 0.9],
        ];
        let labels = vec![
            // k = 2: top-2 are slots 0 and 2, both active
            vec![1.0, 0.0, 1.0, 0.0],
            // k = 1: top-1 is slot 3, inactive
            vec![0.0, 1.0, 0.0, 0.0],
        ];
        let acc = top_k_accuracy(&scores, &labels).unwrap();
        assert!((acc - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_top_k_accuracy_no_active_slots() {
        let acc = top_k_accuracy(&[vec![0.3, 0.7]], &[vec![0.0, 0.0]]).unwrap();
        assert_eq!(acc, 0.0);
    }

    #[test]
    fn test_top_k_accuracy_shape_mismatch() {
        assert!(top_k_accuracy(&[vec![0.3]], &[]).is_err());
        assert!(top_k_accuracy(&[vec![0.3]], &[vec![1.0, 0.0]]).is_err());
    }

    #[test]
    fn test_eval_score_in_unit_range() {
        let device = Default::default();
        let evaluator = ConvEvaluatorConfig::new()
            .with_base_filters(2)
            .init::<TestBackend>(&device);

        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 16, 16], &device);
        let mut slots = vec![0.0f32; 2 * NUM_OBJECTS];
        slots[3] = 1.0;
        slots[NUM_OBJECTS + 7] = 1.0;
        slots[NUM_OBJECTS + 8] = 1.0;
        let conditions =
            Tensor::<TestBackend, 2>::from_floats(TensorData::new(slots, [2, NUM_OBJECTS]), &device);

        assert_eq!(evaluator.forward(images.clone()).dims(), [2, NUM_OBJECTS]);
        let score = evaluator.eval(images, conditions).unwrap();
        assert!((0.0..=1.0).contains(&score));
    }
}
