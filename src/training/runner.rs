//! Lockstep training and evaluation of several classifiers
//!
//! Every model sees the same training batches in the same order. For each
//! batch all models first compute their own loss and gradients, then every
//! optimizer steps once. After each epoch each model is evaluated on the whole
//! test set as a single batch, and the per-epoch accuracies are appended to
//! its train/test curves.

use std::path::Path;

use burn::{
    data::dataloader::batcher::Batcher,
    module::AutodiffModule,
    nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig},
    optim::{GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{EegBatch, EegBatcher, EegDataset, EegItem};
use crate::model::{EegClassifier, ExperimentConfig};
use crate::utils::error::{LabError, Result};
use crate::utils::logging::EpochLogger;

/// Per-model train and test accuracy curves, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCurves {
    pub name: String,
    pub train: Vec<f64>,
    pub test: Vec<f64>,
}

/// Accuracy curves of every model in a run, in entry order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyCurves {
    models: Vec<ModelCurves>,
}

impl AccuracyCurves {
    /// Empty curves for the given model names
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            models: names
                .iter()
                .map(|name| ModelCurves {
                    name: name.as_ref().to_string(),
                    train: Vec::new(),
                    test: Vec::new(),
                })
                .collect(),
        }
    }

    /// Append one epoch of accuracies for the model at `index`
    pub fn push(&mut self, index: usize, train: f64, test: f64) -> Result<()> {
        let len = self.models.len();
        let curves = self
            .models
            .get_mut(index)
            .ok_or(LabError::IndexOutOfRange { index, len })?;
        curves.train.push(train);
        curves.test.push(test);
        Ok(())
    }

    /// Curve by rendered key (`<name>_train` or `<name>_test`)
    pub fn get(&self, key: &str) -> Option<&[f64]> {
        if let Some(name) = key.strip_suffix("_train") {
            if let Some(curves) = self.model(name) {
                return Some(&curves.train);
            }
        }
        if let Some(name) = key.strip_suffix("_test") {
            if let Some(curves) = self.model(name) {
                return Some(&curves.test);
            }
        }
        None
    }

    pub fn model(&self, name: &str) -> Option<&ModelCurves> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn models(&self) -> &[ModelCurves] {
        &self.models
    }

    /// Every curve as `(key, values)`: all train curves, then all test curves
    pub fn series(&self) -> Vec<(String, &[f64])> {
        let train = self
            .models
            .iter()
            .map(|m| (format!("{}_train", m.name), m.train.as_slice()));
        let test = self
            .models
            .iter()
            .map(|m| (format!("{}_test", m.name), m.test.as_slice()));
        train.chain(test).collect()
    }

    /// Number of epochs recorded so far
    pub fn epochs(&self) -> usize {
        self.models.first().map(|m| m.train.len()).unwrap_or(0)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// A named model with its own optimizer
///
/// Gradients from [`ModelEntry::compute_gradients`] are held until
/// [`ModelEntry::apply_step`], so several entries can share a batch before any
/// of them updates.
pub struct ModelEntry<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    name: String,
    model: M,
    optimizer: O,
    pending: Option<GradientsParams>,
    _backend: std::marker::PhantomData<B>,
}

impl<B, M, O> ModelEntry<B, M, O>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + EegClassifier<B>,
    M::InnerModule: EegClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    pub fn new(name: impl Into<String>, model: M, optimizer: O) -> Self {
        Self {
            name: name.into(),
            model,
            optimizer,
            pending: None,
            _backend: std::marker::PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Forward, loss and backward on `batch`; returns the number of correct predictions
    pub fn compute_gradients(
        &mut self,
        batch: &EegBatch<B>,
        loss: &CrossEntropyLoss<B>,
    ) -> Result<usize> {
        let logits = self.model.classify(batch.signals.clone())?;
        let correct = count_correct(logits.clone(), batch.targets.clone());

        let loss = loss.forward(logits, batch.targets.clone());
        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.pending = Some(grads);

        Ok(correct)
    }

    /// Step the optimizer with the gradients from the last `compute_gradients`
    pub fn apply_step(&mut self, learning_rate: f64) {
        if let Some(grads) = self.pending.take() {
            self.model = self.optimizer.step(learning_rate, self.model.clone(), grads);
        }
    }

    /// Correct predictions on `batch` in evaluation mode
    pub fn evaluate(&self, batch: &EegBatch<B::InnerBackend>) -> Result<usize> {
        let model = self.model.valid();
        let logits = model.classify(batch.signals.clone())?;
        Ok(count_correct(logits, batch.targets.clone()))
    }
}

/// Count rows whose arg-max matches the target class
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    let predictions = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predictions
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem();
    correct as usize
}

fn percent(correct: usize, total: usize) -> f64 {
    correct as f64 * 100.0 / total as f64
}

fn progress_bar(epochs: usize, show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(epochs as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} epochs {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Train and test every entry in lockstep for `config.epochs` epochs
///
/// The entries are consumed; their models and device buffers are released
/// when this returns.
pub fn run_models<B, M, O>(
    family: &str,
    mut entries: Vec<ModelEntry<B, M, O>>,
    train: &EegDataset,
    test: &EegDataset,
    config: &ExperimentConfig,
    device: &B::Device,
) -> Result<AccuracyCurves>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + EegClassifier<B>,
    M::InnerModule: EegClassifier<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    if train.items().is_empty() || test.items().is_empty() {
        return Err(LabError::Dataset(format!(
            "cannot run with {} training and {} test samples",
            train.items().len(),
            test.items().len()
        )));
    }
    if config.batch_size == 0 {
        return Err(LabError::Config("batch_size must be greater than 0".to_string()));
    }

    let names: Vec<&str> = entries.iter().map(|e| e.name()).collect();
    let mut curves = AccuracyCurves::new(&names);

    let batcher = EegBatcher::for_dataset(train);
    let loss = CrossEntropyLossConfig::new().init(device);
    let test_batch = Batcher::<B::InnerBackend, EegItem, EegBatch<B::InnerBackend>>::batch(
        &EegBatcher::for_dataset(test),
        test.items().to_vec(),
        device,
    );

    let train_total = train.items().len();
    let test_total = test.items().len();

    info!(
        "{}: {} models, {} epochs, batch size {}, learning rate {}",
        family,
        entries.len(),
        config.epochs,
        config.batch_size,
        config.learning_rate
    );

    let mut logger = EpochLogger::new(family, config.epochs);
    let pb = progress_bar(config.epochs, config.show_progress);

    for epoch in 0..config.epochs {
        logger.start_epoch(epoch);
        let mut train_correct = vec![0usize; entries.len()];

        for start in (0..train_total).step_by(config.batch_size) {
            let items = train.slice(start, start + config.batch_size);
            let batch = Batcher::<B, EegItem, EegBatch<B>>::batch(&batcher, items, device);

            for (entry, correct) in entries.iter_mut().zip(train_correct.iter_mut()) {
                *correct += entry.compute_gradients(&batch, &loss)?;
            }
            for entry in entries.iter_mut() {
                entry.apply_step(config.learning_rate);
            }
        }

        for (index, entry) in entries.iter().enumerate() {
            let train_acc = percent(train_correct[index], train_total);
            let test_acc = percent(entry.evaluate(&test_batch)?, test_total);
            curves.push(index, train_acc, test_acc)?;
            logger.log_model(entry.name(), train_acc, test_acc);
        }

        logger.end_epoch();
        pb.inc(1);
    }

    pb.finish_and_clear();
    logger.finish();

    drop(entries);
    Ok(curves)
}
