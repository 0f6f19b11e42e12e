//! Training module
//!
//! - `runner`: lockstep multi-model training and evaluation
//! - `results`: best-accuracy table and accuracy charts
//! - `experiment`: the EEG activation comparison built on both

pub mod experiment;
pub mod results;
pub mod runner;

pub use experiment::{run_comparison, run_eeg_experiment, run_family};
pub use results::AccuracyTable;
pub use runner::{run_models, AccuracyCurves, ModelEntry};
