//! Burn Dataset Integration for EEG signals
//!
//! Implements Burn's `Dataset` trait and `Batcher` for fixed-shape EEG trials.

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::utils::error::{LabError, Result};

/// A single EEG trial ready for Burn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EegItem {
    /// Signal as a flattened channel-major array [electrodes * time_samples]
    pub signal: Vec<f32>,
    /// Class label
    pub label: usize,
}

/// Fixed-length, read-only EEG dataset
///
/// Every item has the same `electrodes * time_samples` length; order is the
/// order of the arrays passed to [`EegDataset::new`].
#[derive(Debug, Clone)]
pub struct EegDataset {
    items: Vec<EegItem>,
    electrodes: usize,
    time_samples: usize,
}

impl EegDataset {
    /// Build a dataset from parallel arrays of signals and labels.
    ///
    /// Labels are cast to integer class indices.
    pub fn new(
        inputs: Vec<Vec<f32>>,
        labels: Vec<f32>,
        electrodes: usize,
        time_samples: usize,
    ) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(LabError::Dataset(format!(
                "{} inputs but {} labels",
                inputs.len(),
                labels.len()
            )));
        }

        let expected = electrodes * time_samples;
        let items = inputs
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (signal, label))| {
                if signal.len() != expected {
                    return Err(LabError::ShapeMismatch {
                        context: format!("EEG sample {}", i),
                        expected,
                        actual: signal.len(),
                    });
                }
                if !(label >= 0.0) {
                    return Err(LabError::Dataset(format!(
                        "sample {} has invalid label {}",
                        i, label
                    )));
                }
                Ok(EegItem {
                    signal,
                    label: label as usize,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            items,
            electrodes,
            time_samples,
        })
    }

    /// Checked access by index
    pub fn item(&self, index: usize) -> Result<&EegItem> {
        self.items.get(index).ok_or(LabError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// `(electrodes, time_samples)` shared by every item
    pub fn shape(&self) -> (usize, usize) {
        (self.electrodes, self.time_samples)
    }

    /// Items in `[start, end)`, clamped to the dataset length
    pub fn slice(&self, start: usize, end: usize) -> Vec<EegItem> {
        let end = end.min(self.items.len());
        let start = start.min(end);
        self.items[start..end].to_vec()
    }

    /// All items, in order
    pub fn items(&self) -> &[EegItem] {
        &self.items
    }

    /// Samples per class count
    pub fn class_distribution(&self) -> Vec<usize> {
        let num_classes = self.items.iter().map(|i| i.label + 1).max().unwrap_or(0);
        let mut counts = vec![0usize; num_classes];
        for item in &self.items {
            counts[item.label] += 1;
        }
        counts
    }
}

impl Dataset<EegItem> for EegDataset {
    fn get(&self, index: usize) -> Option<EegItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// A batch of EEG trials
#[derive(Clone, Debug)]
pub struct EegBatch<B: Backend> {
    /// Signals with shape [batch_size, 1, electrodes, time_samples]
    pub signals: Tensor<B, 4>,
    /// Labels with shape [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher stacking EEG trials into a 4D tensor
#[derive(Clone, Debug)]
pub struct EegBatcher {
    electrodes: usize,
    time_samples: usize,
}

impl EegBatcher {
    pub fn new(electrodes: usize, time_samples: usize) -> Self {
        Self {
            electrodes,
            time_samples,
        }
    }

    /// Batcher matching the shape of `dataset`
    pub fn for_dataset(dataset: &EegDataset) -> Self {
        let (electrodes, time_samples) = dataset.shape();
        Self::new(electrodes, time_samples)
    }
}

impl<B: Backend> Batcher<B, EegItem, EegBatch<B>> for EegBatcher {
    fn batch(&self, items: Vec<EegItem>, device: &B::Device) -> EegBatch<B> {
        let batch_size = items.len();

        let signals_data: Vec<f32> = items
            .iter()
            .flat_map(|item| item.signal.iter().copied())
            .collect();
        let signals = Tensor::<B, 4>::from_floats(
            TensorData::new(
                signals_data,
                [batch_size, 1, self.electrodes, self.time_samples],
            ),
            device,
        );

        let targets_data: Vec<i64> = items.iter().map(|item| item.label as i64).collect();
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [batch_size]), device);

        EegBatch { signals, targets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn toy_dataset() -> EegDataset {
        EegDataset::new(
            vec![
                vec![0.0, 1.0, 2.0, 3.0],
                vec![4.0, 5.0, 6.0, 7.0],
                vec![8.0, 9.0, 10.0, 11.0],
            ],
            vec![0.0, 1.0, 1.0],
            2,
            2,
        )
        .unwrap()
    }

    #[test]
    fn test_length_and_order_preserved() {
        let dataset = toy_dataset();
        assert_eq!(dataset.len(), 3);
        let item = dataset.get(1).unwrap();
        assert_eq!(item.signal, vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(item.label, 1);
        assert_eq!(dataset.item(2).unwrap().signal[3], 11.0);
    }

    #[test]
    fn test_out_of_range_access() {
        let dataset = toy_dataset();
        assert!(dataset.get(3).is_none());
        match dataset.item(3) {
            Err(LabError::IndexOutOfRange { index, len }) => {
                assert_eq!(index, 3);
                assert_eq!(len, 3);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        assert!(EegDataset::new(vec![vec![0.0; 4]], vec![0.0, 1.0], 2, 2).is_err());
        assert!(matches!(
            EegDataset::new(vec![vec![0.0; 3]], vec![0.0], 2, 2),
            Err(LabError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_class_distribution() {
        assert_eq!(toy_dataset().class_distribution(), vec![1, 2]);
    }

    #[test]
    fn test_slice_clamps() {
        let dataset = toy_dataset();
        assert_eq!(dataset.slice(2, 10).len(), 1);
        assert!(dataset.slice(5, 10).is_empty());
    }

    #[test]
    fn test_batcher_shapes() {
        let dataset = toy_dataset();
        let device = Default::default();
        let batcher = EegBatcher::for_dataset(&dataset);
        let batch: EegBatch<TestBackend> = batcher.batch(dataset.slice(0, 3), &device);

        assert_eq!(batch.signals.dims(), [3, 1, 2, 2]);
        assert_eq!(batch.targets.dims(), [3]);

        let values = batch.signals.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values[4], 4.0);
    }
}
