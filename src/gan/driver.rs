//! GAN evaluation pipeline
//!
//! For every condition set, in order: load conditions, sample standard normal
//! noise, generate once, score with the frozen evaluator, log the score and
//! save the image grid. Any failure aborts the run.

use std::path::{Path, PathBuf};

use burn::tensor::{backend::Backend, Distribution, Tensor};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::conditions::Conditions;
use super::evaluator::{ConvEvaluatorConfig, EvaluationModel};
use super::generator::{checkpoint_path, ConditionalGenerator, GeneratorConfig};
use super::image_grid::{save_image_grid, DEFAULT_NROW};
use crate::utils::error::{LabError, Result};

/// One condition file to evaluate and the grid image it produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSet {
    /// Label printed next to the score
    pub label: String,
    /// Condition file, relative to `data_dir`
    pub conditions: PathBuf,
    /// Grid image, relative to `output_dir`
    pub output: PathBuf,
}

impl ConditionSet {
    pub fn new(label: &str, conditions: &str, output: &str) -> Self {
        Self {
            label: label.to_string(),
            conditions: PathBuf::from(conditions),
            output: PathBuf::from(output),
        }
    }
}

/// Configuration of a GAN evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GanEvalConfig {
    pub data_dir: PathBuf,
    pub models_dir: PathBuf,
    pub output_dir: PathBuf,
    pub z_dim: usize,
    pub c_dim: usize,
    /// Generator steps per discriminator step during training; part of the checkpoint path
    pub g_times: usize,
    pub epoch: usize,
    pub score: f64,
    pub generator_filters: usize,
    pub evaluator_checkpoint: PathBuf,
    pub evaluator_filters: usize,
    pub condition_sets: Vec<ConditionSet>,
}

impl Default for GanEvalConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            models_dir: PathBuf::from("models"),
            output_dir: PathBuf::from("."),
            z_dim: 100,
            c_dim: 200,
            g_times: 4,
            epoch: 189,
            score: 0.72,
            generator_filters: 64,
            evaluator_checkpoint: PathBuf::from("models/evaluator.mpk"),
            evaluator_filters: 32,
            condition_sets: vec![
                ConditionSet::new("Test score", "test.json", "test.png"),
                ConditionSet::new("New test score", "new_test.json", "new test.png"),
            ],
        }
    }
}

impl GanEvalConfig {
    pub fn generator_path(&self) -> PathBuf {
        checkpoint_path(&self.models_dir, self.c_dim, self.g_times, self.epoch, self.score)
    }

    pub fn objects_path(&self) -> PathBuf {
        self.data_dir.join("objects.json")
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::new()
            .with_z_dim(self.z_dim)
            .with_c_dim(self.c_dim)
            .with_base_filters(self.generator_filters)
    }

    pub fn evaluator_config(&self) -> ConvEvaluatorConfig {
        ConvEvaluatorConfig::new().with_base_filters(self.evaluator_filters)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Score of one condition set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GanScore {
    pub label: String,
    pub score: f32,
    pub image: PathBuf,
}

/// Generate images for `conditions`, score them and write the grid to `output`
pub fn evaluate_condition_set<B: Backend, E: EvaluationModel<B>>(
    generator: &ConditionalGenerator<B>,
    evaluator: &E,
    conditions: &Conditions,
    output: &Path,
    device: &B::Device,
) -> Result<f32> {
    if conditions.is_empty() {
        return Err(LabError::Dataset("condition set is empty".to_string()));
    }

    let conditions = conditions.to_tensor::<B>(device);
    let noise = Tensor::<B, 2>::random(
        [conditions.dims()[0], generator.z_dim()],
        Distribution::Normal(0.0, 1.0),
        device,
    );

    let images = generator.forward(noise, conditions.clone())?;
    let score = evaluator.eval(images.clone(), conditions)?;
    save_image_grid(images, output, DEFAULT_NROW)?;

    Ok(score)
}

/// Run every configured condition set through the generator and evaluator
pub fn run_gan_evaluation<B: Backend>(
    config: &GanEvalConfig,
    device: &B::Device,
) -> Result<Vec<GanScore>> {
    let generator_path = config.generator_path();
    info!("Loading generator from {}", generator_path.display());
    let generator = config.generator_config().load::<B>(&generator_path, device)?;

    info!("Loading evaluator from {}", config.evaluator_checkpoint.display());
    let evaluator = config
        .evaluator_config()
        .load::<B>(&config.evaluator_checkpoint, device)?;

    std::fs::create_dir_all(&config.output_dir)?;
    let objects_path = config.objects_path();

    let mut scores = Vec::with_capacity(config.condition_sets.len());
    for set in &config.condition_sets {
        let conditions = Conditions::load(&config.data_dir.join(&set.conditions), &objects_path)?;
        let image = config.output_dir.join(&set.output);

        let score = evaluate_condition_set(&generator, &evaluator, &conditions, &image, device)?;
        info!("{}: {:.6} ({} images -> {})", set.label, score, conditions.len(), image.display());

        scores.push(GanScore {
            label: set.label.clone(),
            score,
            image,
        });
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::module::Module;
    use burn::record::CompactRecorder;
    use burn_ndarray::NdArray;
    use std::fs;

    type TestBackend = NdArray;

    struct FixedScore(f32);

    impl<B: Backend> EvaluationModel<B> for FixedScore {
        fn eval(&self, _images: Tensor<B, 4>, _conditions: Tensor<B, 2>) -> Result<f32> {
            Ok(self.0)
        }
    }

    fn small_config(root: &Path) -> GanEvalConfig {
        GanEvalConfig {
            data_dir: root.join("data"),
            models_dir: root.join("models"),
            output_dir: root.join("out"),
            z_dim: 4,
            c_dim: 3,
            generator_filters: 2,
            evaluator_checkpoint: root.join("models").join("evaluator.mpk"),
            evaluator_filters: 2,
            ..GanEvalConfig::default()
        }
    }

    #[test]
    fn test_default_generator_path() {
        assert_eq!(
            GanEvalConfig::default().generator_path(),
            PathBuf::from("models/c_dim 200 G4/epoch189_score0.72.mpk")
        );
    }

    #[test]
    fn test_evaluate_condition_set() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let generator = small_config(dir.path())
            .generator_config()
            .init::<TestBackend>(&device);

        let objects = [("gray cube".to_string(), 0)].into_iter().collect();
        let conditions =
            Conditions::encode(&[vec!["gray cube".to_string()], vec![]], &objects).unwrap();
        let output = dir.path().join("grid.png");

        let score =
            evaluate_condition_set(&generator, &FixedScore(0.5), &conditions, &output, &device)
                .unwrap();
        assert_eq!(score, 0.5);
        assert!(output.exists());
    }

    #[test]
    fn test_empty_condition_set_rejected() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let generator = small_config(dir.path())
            .generator_config()
            .init::<TestBackend>(&device);
        let empty = Conditions::encode(&[], &Default::default()).unwrap();

        assert!(evaluate_condition_set(
            &generator,
            &FixedScore(1.0),
            &empty,
            &dir.path().join("x.png"),
            &device
        )
        .is_err());
    }

    #[test]
    fn test_full_pipeline() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let config = small_config(dir.path());

        let data_dir = &config.data_dir;
        fs::create_dir_all(data_dir).unwrap();
        fs::write(data_dir.join("objects.json"), r#"{"gray cube": 0, "red sphere": 1}"#).unwrap();
        fs::write(data_dir.join("test.json"), r#"[["gray cube"], ["red sphere"]]"#).unwrap();
        fs::write(data_dir.join("new_test.json"), r#"[["gray cube", "red sphere"]]"#).unwrap();

        let generator_path = config.generator_path();
        fs::create_dir_all(generator_path.parent().unwrap()).unwrap();
        config
            .generator_config()
            .init::<TestBackend>(&device)
            .save_file(generator_path, &CompactRecorder::new())
            .unwrap();
        config
            .evaluator_config()
            .init::<TestBackend>(&device)
            .save_file(config.evaluator_checkpoint.clone(), &CompactRecorder::new())
            .unwrap();

        let scores = run_gan_evaluation::<TestBackend>(&config, &device).unwrap();

        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].label, "Test score");
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(&s.score)));
        assert!(config.output_dir.join("test.png").exists());
        assert!(config.output_dir.join("new test.png").exists());
    }

    #[test]
    fn test_missing_checkpoint_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = run_gan_evaluation::<TestBackend>(&small_config(dir.path()), &Default::default());
        assert!(matches!(result, Err(LabError::Checkpoint(..))));
    }
}
