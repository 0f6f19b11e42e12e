//! Conditional GAN evaluation
//!
//! - `conditions`: object-name lists to multi-hot condition vectors
//! - `generator`: the conditional generator and its checkpoint layout
//! - `evaluator`: the frozen scoring model and top-k accuracy
//! - `image_grid`: PNG grids of generated images
//! - `driver`: the end-to-end evaluation pipeline

pub mod conditions;
pub mod driver;
pub mod evaluator;
pub mod generator;
pub mod image_grid;

pub use conditions::{Conditions, NUM_OBJECTS};
pub use driver::{run_gan_evaluation, ConditionSet, GanEvalConfig, GanScore};
pub use evaluator::{top_k_accuracy, ConvEvaluator, ConvEvaluatorConfig, EvaluationModel};
pub use generator::{checkpoint_path, ConditionalGenerator, GeneratorConfig};
pub use image_grid::save_image_grid;
