//! Conditional DCGAN-style generator
//!
//! The condition vector is embedded with a linear layer and ReLU, concatenated
//! with the noise vector and treated as a 1x1 feature map. Transposed
//! convolutions then upsample 1 -> 4 -> 8 -> 16 -> 32 -> 64.

use std::path::{Path, PathBuf};

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{ConvTranspose2d, ConvTranspose2dConfig},
        BatchNorm, BatchNormConfig, Linear, LinearConfig, Relu,
    },
    record::CompactRecorder,
    tensor::{activation::tanh, backend::Backend, Tensor},
};

use super::conditions::NUM_OBJECTS;
use crate::utils::error::{LabError, Result as LabResult};

/// Configuration for [`ConditionalGenerator`]
#[derive(Config, Debug)]
pub struct GeneratorConfig {
    /// Noise dimension
    #[config(default = "100")]
    pub z_dim: usize,

    /// Condition embedding dimension
    #[config(default = "200")]
    pub c_dim: usize,

    /// Feature maps of the last hidden stage; earlier stages use 8x, 4x, 2x
    #[config(default = "64")]
    pub base_filters: usize,

    #[config(default = "3")]
    pub out_channels: usize,
}

impl GeneratorConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConditionalGenerator<B> {
        let f = self.base_filters;
        let stages = vec![
            // 1x1 -> 4x4
            UpStage::new(self.z_dim + self.c_dim, f * 8, 1, 0, device),
            UpStage::new(f * 8, f * 4, 2, 1, device),
            UpStage::new(f * 4, f * 2, 2, 1, device),
            UpStage::new(f * 2, f, 2, 1, device),
        ];

        ConditionalGenerator {
            embed: LinearConfig::new(NUM_OBJECTS, self.c_dim).init(device),
            relu: Relu::new(),
            stages,
            output: ConvTranspose2dConfig::new([f, self.out_channels], [4, 4])
                .with_stride([2, 2])
                .with_padding([1, 1])
                .with_bias(false)
                .init(device),
            z_dim: self.z_dim,
            c_dim: self.c_dim,
        }
    }

    /// Build a generator and load its weights from a recorder file
    pub fn load<B: Backend>(
        &self,
        path: &Path,
        device: &B::Device,
    ) -> LabResult<ConditionalGenerator<B>> {
        self.init::<B>(device)
            .load_file(path.to_path_buf(), &CompactRecorder::new(), device)
            .map_err(|e| LabError::Checkpoint(path.to_path_buf(), format!("{:?}", e)))
    }
}

/// `<models_dir>/c_dim <c_dim> G<g_times>/epoch<epoch>_score<score>.mpk`
///
/// The extension is explicit so the recorder does not treat the decimal part
/// of the score as one.
pub fn checkpoint_path(
    models_dir: &Path,
    c_dim: usize,
    g_times: usize,
    epoch: usize,
    score: f64,
) -> PathBuf {
    models_dir
        .join(format!("c_dim {} G{}", c_dim, g_times))
        .join(format!("epoch{}_score{}.mpk", epoch, score))
}

/// Transposed conv, batch norm, ReLU
#[derive(Module, Debug)]
pub struct UpStage<B: Backend> {
    deconv: ConvTranspose2d<B>,
    bn: BatchNorm<B>,
    relu: Relu,
}

impl<B: Backend> UpStage<B> {
    fn new(
        in_channels: usize,
        out_channels: usize,
        stride: usize,
        padding: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            deconv: ConvTranspose2dConfig::new([in_channels, out_channels], [4, 4])
                .with_stride([stride, stride])
                .with_padding([padding, padding])
                .with_bias(false)
                .init(device),
            bn: BatchNormConfig::new(out_channels).init(device),
            relu: Relu::new(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        self.relu.forward(self.bn.forward(self.deconv.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct ConditionalGenerator<B: Backend> {
    embed: Linear<B>,
    relu: Relu,
    stages: Vec<UpStage<B>>,
    output: ConvTranspose2d<B>,
    z_dim: usize,
    c_dim: usize,
}

impl<B: Backend> ConditionalGenerator<B> {
    /// `[n, z_dim]` noise and `[n, 24]` conditions to `[n, 3, 64, 64]` images in [-1, 1]
    pub fn forward(
        &self,
        noise: Tensor<B, 2>,
        conditions: Tensor<B, 2>,
    ) -> LabResult<Tensor<B, 4>> {
        let [n, z] = noise.dims();
        let [n_cond, slots] = conditions.dims();
        if z != self.z_dim {
            return Err(LabError::ShapeMismatch {
                context: "generator noise".to_string(),
                expected: self.z_dim,
                actual: z,
            });
        }
        if slots != NUM_OBJECTS || n_cond != n {
            return Err(LabError::ShapeMismatch {
                context: format!("generator conditions for {} noise rows", n),
                expected: n * NUM_OBJECTS,
                actual: n_cond * slots,
            });
        }

        let embedded = self.relu.forward(self.embed.forward(conditions));
        let x = Tensor::cat(vec![noise, embedded], 1).reshape([n, self.z_dim + self.c_dim, 1, 1]);
        let x = self.stages.iter().fold(x, |x, stage| stage.forward(x));
        Ok(tanh(self.output.forward(x)))
    }

    pub fn z_dim(&self) -> usize {
        self.z_dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn small_config() -> GeneratorConfig {
        GeneratorConfig::new().with_z_dim(8).with_c_dim(6).with_base_filters(2)
    }

    #[test]
    fn test_checkpoint_path() {
        let path = checkpoint_path(Path::new("models"), 200, 4, 189, 0.72);
        assert_eq!(path, PathBuf::from("models/c_dim 200 G4/epoch189_score0.72.mpk"));
    }

    #[test]
    fn test_config_json() {
        let config = GeneratorConfig::new().with_c_dim(24);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: GeneratorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.c_dim, 24);
        assert_eq!(parsed.z_dim, 100);
    }

    #[test]
    fn test_output_shape_and_range() {
        let device = Default::default();
        let generator = small_config().init::<TestBackend>(&device);

        let noise = Tensor::<TestBackend, 2>::ones([2, 8], &device);
        let conditions = Tensor::<TestBackend, 2>::zeros([2, NUM_OBJECTS], &device);
        let images = generator.forward(noise, conditions).unwrap();

        assert_eq!(images.dims(), [2, 3, 64, 64]);
        let values: Vec<f32> = images.into_data().to_vec().unwrap();
        assert!(values.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn test_mismatched_inputs_rejected() {
        let device = Default::default();
        let generator = small_config().init::<TestBackend>(&device);

        let noise = Tensor::<TestBackend, 2>::ones([2, 5], &device);
        let conditions = Tensor::<TestBackend, 2>::zeros([2, NUM_OBJECTS], &device);
        assert!(generator.forward(noise, conditions).is_err());

        let noise = Tensor::<TestBackend, 2>::ones([3, 8], &device);
        let conditions = Tensor::<TestBackend, 2>::zeros([2, NUM_OBJECTS], &device);
        assert!(generator.forward(noise, conditions).is_err());
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let path = checkpoint_path(dir.path(), 6, 4, 1, 0.5);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        small_config()
            .init::<TestBackend>(&device)
            .save_file(path.clone(), &CompactRecorder::new())
            .unwrap();

        assert!(small_config().load::<TestBackend>(&path, &device).is_ok());
        assert!(matches!(
            small_config().load::<TestBackend>(&dir.path().join("missing"), &device),
            Err(LabError::Checkpoint(..))
        ));
    }
}
