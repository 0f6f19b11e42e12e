//! Dataset module
//!
//! - `burn_dataset`: the EEG dataset adapter and batcher
//! - `bci`: CSV reader for the BCI competition EEG recordings
//! - `retinopathy`: diabetic retinopathy image dataset

pub mod bci;
pub mod burn_dataset;
pub mod retinopathy;

pub use bci::read_bci_data;
pub use burn_dataset::{EegBatch, EegBatcher, EegDataset, EegItem};
pub use retinopathy::{Mode, RetinopathyBatch, RetinopathyBatcher, RetinopathyDataset, RetinopathyItem};

/// Electrodes per BCI trial
pub const EEG_ELECTRODES: usize = 2;

/// Time samples per BCI trial
pub const EEG_TIME_SAMPLES: usize = 750;

/// Number of motor-imagery classes
pub const EEG_NUM_CLASSES: usize = 2;
