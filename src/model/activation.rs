//! Activation variants shared by both EEG classifier families

use std::fmt;

use burn::tensor::{activation, backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

/// Negative slope of the leaky rectifier
pub const LEAKY_RELU_SLOPE: f64 = 0.01;

/// Scale of the negative branch of ELU
pub const ELU_ALPHA: f64 = 1.0;

/// Nonlinearity applied identically after every convolutional stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    Relu,
    LeakyRelu,
    Elu,
}

impl Activation {
    /// Every variant, in result-table column order
    pub const ALL: [Activation; 3] = [Activation::Relu, Activation::LeakyRelu, Activation::Elu];

    /// Key used for model entries and curve names
    pub fn key(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::LeakyRelu => "leaky_relu",
            Activation::Elu => "elu",
        }
    }

    /// Result-table column header
    pub fn column(&self) -> &'static str {
        match self {
            Activation::Relu => "ReLU",
            Activation::LeakyRelu => "Leaky ReLU",
            Activation::Elu => "ELU",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.key() == key)
    }

    pub fn apply<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        match self {
            Activation::Relu => activation::relu(x),
            Activation::LeakyRelu => activation::leaky_relu(x, LEAKY_RELU_SLOPE),
            // max(x, 0) + alpha * (exp(min(x, 0)) - 1)
            Activation::Elu => {
                let negative = x.clone().clamp_max(0.0).exp().sub_scalar(1.0).mul_scalar(ELU_ALPHA);
                x.clamp_min(0.0) + negative
            }
        }
    }
}

impl Default for Activation {
    fn default() -> Self {
        Self::Elu
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::tensor::TensorData;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn apply(activation: Activation, values: [f32; 3]) -> Vec<f32> {
        let device = Default::default();
        let x = Tensor::<TestBackend, 1>::from_floats(TensorData::new(values.to_vec(), [3]), &device);
        activation.apply(x).into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_relu() {
        assert_eq!(apply(Activation::Relu, [-2.0, 0.0, 3.0]), vec![0.0, 0.0, 3.0]);
    }

    #[test]
    fn test_leaky_relu() {
        let out = apply(Activation::LeakyRelu, [-2.0, 0.0, 3.0]);
        assert!((out[0] + 0.02).abs() < 1e-6);
        assert_eq!(out[2], 3.0);
    }

    #[test]
    fn test_elu() {
        let out = apply(Activation::Elu, [-1.0, 0.0, 2.0]);
        assert!((out[0] - ((-1.0f32).exp() - 1.0)).abs() < 1e-6);
        assert!(out[1].abs() < 1e-6);
        assert!((out[2] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_keys_round_trip() {
        for activation in Activation::ALL {
            assert_eq!(Activation::from_key(activation.key()), Some(activation));
        }
        assert_eq!(Activation::from_key("tanh"), None);
        assert_eq!(Activation::LeakyRelu.column(), "Leaky ReLU");
    }
}
