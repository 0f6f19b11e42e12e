//! Model module containing the EEG classifier families
//!
//! - `activation`: the activation variants compared in every experiment
//! - `eegnet`: EEGNet (depthwise-separable)
//! - `deep_conv_net`: DeepConvNet (stacked conv/pool stages)
//! - `config`: experiment hyperparameters

pub mod activation;
pub mod config;
pub mod deep_conv_net;
pub mod eegnet;

pub use activation::Activation;
pub use config::ExperimentConfig;
pub use deep_conv_net::{DeepConvNet, DeepConvNetConfig};
pub use eegnet::{EegNet, EegNetConfig};

use burn::module::Module;
use burn::tensor::{backend::Backend, Tensor};

use crate::utils::error::Result;

/// A classifier mapping `[batch, 1, electrodes, time]` signals to class logits
pub trait EegClassifier<B: Backend>: Module<B> {
    /// Class logits `[batch, num_classes]`; fails on a flatten size mismatch
    fn classify(&self, x: Tensor<B, 4>) -> Result<Tensor<B, 2>>;

    /// Feature count entering the final linear layer
    fn flatten_size(&self) -> usize;
}

/// The two classifier families compared in the EEG experiment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    EegNet,
    DeepConvNet,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 2] = [ModelFamily::EegNet, ModelFamily::DeepConvNet];

    /// Row name in the result table and chart file prefix
    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::EegNet => "EEGNet",
            ModelFamily::DeepConvNet => "DeepConvNet",
        }
    }
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
