//! # dl_labs
//!
//! Deep-learning lab experiments built on the Burn framework.
//!
//! ## Features
//!
//! - **EEG classification**: EEGNet and DeepConvNet, each with ReLU, LeakyReLU
//!   and ELU variants, trained side by side on the BCI competition data
//! - **Result aggregation**: best test accuracy per family and activation, plus
//!   accuracy-vs-epoch SVG charts
//! - **Retinopathy dataset**: CSV-indexed JPEG loader with training-time flips
//! - **GAN evaluation**: conditional generator scored by a frozen multi-label
//!   classifier, with PNG image grids
//!
//! ## Modules
//!
//! - `backend`: compile-time backend selection
//! - `dataset`: EEG and retinopathy datasets and batchers
//! - `model`: EEG classifier families and experiment configuration
//! - `training`: lockstep multi-model training, result table, experiment driver
//! - `gan`: conditional GAN evaluation pipeline
//! - `utils`: errors, logging and charts
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dl_labs::backend::{default_device, TrainingBackend};
//! use dl_labs::model::ExperimentConfig;
//! use dl_labs::training::run_eeg_experiment;
//!
//! let device = default_device();
//! let table = run_eeg_experiment::<TrainingBackend>(&ExperimentConfig::default(), &device)?;
//! ```

pub mod backend;
pub mod dataset;
pub mod gan;
pub mod model;
pub mod training;
pub mod utils;

pub use dataset::{EegBatch, EegBatcher, EegDataset, EegItem, RetinopathyDataset};
pub use gan::{run_gan_evaluation, GanEvalConfig};
pub use model::{Activation, DeepConvNet, EegClassifier, EegNet, ExperimentConfig, ModelFamily};
pub use training::{run_models, AccuracyCurves, AccuracyTable, ModelEntry};
pub use utils::error::{LabError, Result};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
