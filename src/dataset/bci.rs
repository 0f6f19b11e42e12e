//! BCI competition EEG data reader
//!
//! Signal files hold one trial per row (`electrodes * time_samples`
//! comma-separated values, channel-major). Label files hold one class per row.
//! Missing or NaN readings are replaced by the mean of the file's finite values.

use std::path::Path;

use tracing::{debug, info};

use super::burn_dataset::EegDataset;
use crate::utils::error::{LabError, Result, ResultExt};

pub const TRAIN_SIGNALS: &str = "train_data.csv";
pub const TRAIN_LABELS: &str = "train_label.csv";
pub const TEST_SIGNALS: &str = "test_data.csv";
pub const TEST_LABELS: &str = "test_label.csv";

/// Read the train and test datasets from `data_dir`
pub fn read_bci_data(
    data_dir: &Path,
    electrodes: usize,
    time_samples: usize,
) -> Result<(EegDataset, EegDataset)> {
    let train = read_bci_csv(
        &data_dir.join(TRAIN_SIGNALS),
        &data_dir.join(TRAIN_LABELS),
        electrodes,
        time_samples,
    )?;
    let test = read_bci_csv(
        &data_dir.join(TEST_SIGNALS),
        &data_dir.join(TEST_LABELS),
        electrodes,
        time_samples,
    )?;

    info!(
        "Loaded BCI data: {} train / {} test trials of {}x{}",
        train.items().len(),
        test.items().len(),
        electrodes,
        time_samples
    );
    Ok((train, test))
}

/// Read one signal/label file pair into a dataset
pub fn read_bci_csv(
    signal_path: &Path,
    label_path: &Path,
    electrodes: usize,
    time_samples: usize,
) -> Result<EegDataset> {
    let signal_content = std::fs::read_to_string(signal_path)
        .with_context(|| format!("Failed to read {}", signal_path.display()))?;
    let label_content = std::fs::read_to_string(label_path)
        .with_context(|| format!("Failed to read {}", label_path.display()))?;

    let mut signals = parse_signal_csv(&signal_content)?;
    let replaced = fill_nan_with_mean(&mut signals);
    if replaced > 0 {
        debug!(
            "Replaced {} missing values in {}",
            replaced,
            signal_path.display()
        );
    }
    let labels = parse_label_csv(&label_content)?;

    EegDataset::new(signals, labels, electrodes, time_samples)
}

/// Parse rows of comma-separated floats; empty fields are read as NaN
pub fn parse_signal_csv(content: &str) -> Result<Vec<Vec<f32>>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(row, line)| {
            line.split(',')
                .map(|field| parse_field(field, row))
                .collect::<Result<Vec<f32>>>()
        })
        .collect()
}

/// Parse one label per row
pub fn parse_label_csv(content: &str) -> Result<Vec<f32>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(row, line)| {
            let value = parse_field(line, row)?;
            if value.is_nan() {
                return Err(LabError::Dataset(format!("row {}: missing label", row + 1)));
            }
            Ok(value)
        })
        .collect()
}

fn parse_field(field: &str, row: usize) -> Result<f32> {
    let field = field.trim();
    if field.is_empty() {
        return Ok(f32::NAN);
    }
    field.parse::<f32>().map_err(|e| {
        LabError::Dataset(format!("row {}: cannot parse '{}': {}", row + 1, field, e))
    })
}

/// Replace every NaN with the mean of all finite values. Returns the count replaced.
pub fn fill_nan_with_mean(rows: &mut [Vec<f32>]) -> usize {
    let (sum, count) = rows
        .iter()
        .flat_map(|r| r.iter())
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0usize), |(s, c), v| (s + *v as f64, c + 1));
    let mean = if count == 0 { 0.0 } else { (sum / count as f64) as f32 };

    let mut replaced = 0;
    for value in rows.iter_mut().flat_map(|r| r.iter_mut()) {
        if value.is_nan() {
            *value = mean;
            replaced += 1;
        }
    }
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::data::dataset::Dataset;
    use std::fs;

    #[test]
    fn test_parse_signal_csv() {
        let rows = parse_signal_csv("1,2,3,4\n5,6,7,8\n\n").unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0]]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_signal_csv("1,abc").is_err());
        assert!(parse_label_csv("0\n\n1\nNaN").is_err());
    }

    #[test]
    fn test_nan_replaced_by_mean() {
        let mut rows = parse_signal_csv("1,nan\n,3").unwrap();
        let replaced = fill_nan_with_mean(&mut rows);
        assert_eq!(replaced, 2);
        assert_eq!(rows, vec![vec![1.0, 2.0], vec![2.0, 3.0]]);
    }

    #[test]
    fn test_read_bci_data() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(TRAIN_SIGNALS), "1,2,3,4\n5,6,7,8\n").unwrap();
        fs::write(dir.path().join(TRAIN_LABELS), "0\n1\n").unwrap();
        fs::write(dir.path().join(TEST_SIGNALS), "9,10,11,12\n").unwrap();
        fs::write(dir.path().join(TEST_LABELS), "1.0\n").unwrap();

        let (train, test) = read_bci_data(dir.path(), 2, 2).unwrap();
        assert_eq!(train.len(), 2);
        assert_eq!(test.len(), 1);
        assert_eq!(train.get(1).unwrap().signal, vec![5.0, 6.0, 7.0, 8.0]);
        assert_eq!(test.get(0).unwrap().label, 1);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_bci_data(dir.path(), 2, 750).is_err());
    }
}
