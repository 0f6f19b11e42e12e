//! EEG activation comparison
//!
//! For each model family, three variants (ReLU, LeakyReLU, ELU) are trained in
//! lockstep on the BCI data and merged into one [`AccuracyTable`].

use burn::optim::AdamConfig;
use burn::tensor::backend::AutodiffBackend;
use colored::Colorize;
use tracing::info;

use super::results::AccuracyTable;
use super::runner::{run_models, AccuracyCurves, ModelEntry};
use crate::dataset::{read_bci_data, EegDataset, EEG_ELECTRODES, EEG_NUM_CLASSES, EEG_TIME_SAMPLES};
use crate::model::{Activation, DeepConvNetConfig, EegNetConfig, ExperimentConfig, ModelFamily};
use crate::utils::error::Result;

fn adam() -> AdamConfig {
    AdamConfig::new().with_epsilon(1e-8)
}

/// Train the three activation variants of `family` and return their curves
pub fn run_family<B: AutodiffBackend>(
    family: ModelFamily,
    train: &EegDataset,
    test: &EegDataset,
    config: &ExperimentConfig,
    device: &B::Device,
) -> Result<AccuracyCurves> {
    let (electrodes, time_samples) = train.shape();

    match family {
        ModelFamily::EegNet => {
            let entries: Vec<ModelEntry<B, _, _>> = Activation::ALL
                .iter()
                .map(|&activation| {
                    let model = EegNetConfig::new()
                        .with_activation(activation)
                        .with_dropout(config.eegnet_dropout)
                        .with_electrodes(electrodes)
                        .with_time_samples(time_samples)
                        .with_num_classes(EEG_NUM_CLASSES)
                        .init::<B>(device)?;
                    Ok(ModelEntry::new(activation.key(), model, adam().init()))
                })
                .collect::<Result<_>>()?;
            run_models(family.name(), entries, train, test, config, device)
        }
        ModelFamily::DeepConvNet => {
            let entries: Vec<ModelEntry<B, _, _>> = Activation::ALL
                .iter()
                .map(|&activation| {
                    let model = DeepConvNetConfig::new()
                        .with_activation(activation)
                        .with_dropout(config.deep_conv_dropout)
                        .with_electrodes(electrodes)
                        .with_time_samples(time_samples)
                        .with_num_classes(EEG_NUM_CLASSES)
                        .init::<B>(device)?;
                    Ok(ModelEntry::new(activation.key(), model, adam().init()))
                })
                .collect::<Result<_>>()?;
            run_models(family.name(), entries, train, test, config, device)
        }
    }
}

/// Run every family on already loaded data
pub fn run_comparison<B: AutodiffBackend>(
    train: &EegDataset,
    test: &EegDataset,
    config: &ExperimentConfig,
    device: &B::Device,
) -> Result<AccuracyTable> {
    config.validate()?;
    std::fs::create_dir_all(&config.output_dir)?;

    let params = config.display_params();
    let mut table = AccuracyTable::new();

    for family in ModelFamily::ALL {
        println!("{}", format!("Training & Testing {}", family).cyan().bold());
        let curves = run_family::<B>(family, train, test, config, device)?;

        let curves_path = config.output_dir.join(format!("{}_curves.json", family.name()));
        curves.save_json(&curves_path)?;
        info!("Curves saved to {}", curves_path.display());

        table.add(family.name(), &curves, &params, &config.output_dir)?;
    }

    table.save_json(&config.output_dir.join("accuracy_table.json"))?;
    table.show(&params);
    Ok(table)
}

/// Load the BCI data from `config.data_dir` and run the full comparison
pub fn run_eeg_experiment<B: AutodiffBackend>(
    config: &ExperimentConfig,
    device: &B::Device,
) -> Result<AccuracyTable> {
    let (train, test) = read_bci_data(&config.data_dir, EEG_ELECTRODES, EEG_TIME_SAMPLES)?;
    info!(
        "Train classes: {:?}, test classes: {:?}",
        train.class_distribution(),
        test.class_distribution()
    );
    run_comparison::<B>(&train, &test, config, device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::Autodiff;
    use burn_ndarray::NdArray;

    type TestBackend = Autodiff<NdArray>;

    fn dataset(samples: usize, time_samples: usize) -> EegDataset {
        let inputs = (0..samples)
            .map(|i| {
                (0..2 * time_samples)
                    .map(|t| ((i + t) % 7) as f32 / 7.0 - 0.5)
                    .collect()
            })
            .collect();
        let labels = (0..samples).map(|i| (i % 2) as f32).collect();
        EegDataset::new(inputs, labels, 2, time_samples).unwrap()
    }

    #[test]
    fn test_deep_conv_family_produces_all_curves() {
        let device = Default::default();
        // four default stages: 100 -> 48 -> 22 -> 9 -> 2
        let data = dataset(4, 100);
        let config = ExperimentConfig {
            epochs: 1,
            batch_size: 2,
            show_progress: false,
            ..ExperimentConfig::default()
        };

        let curves =
            run_family::<TestBackend>(ModelFamily::DeepConvNet, &data, &data, &config, &device)
                .unwrap();

        for activation in Activation::ALL {
            assert_eq!(curves.get(&format!("{}_train", activation.key())).unwrap().len(), 1);
            assert_eq!(curves.get(&format!("{}_test", activation.key())).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_comparison_writes_outputs() {
        let device = Default::default();
        let dir = tempfile::tempdir().unwrap();
        let data = dataset(4, 100);
        let config = ExperimentConfig {
            epochs: 1,
            batch_size: 4,
            show_progress: false,
            output_dir: dir.path().to_path_buf(),
            ..ExperimentConfig::default()
        };

        let table = run_comparison::<TestBackend>(&data, &data, &config, &device).unwrap();

        assert_eq!(table.rows().len(), 2);
        assert!(dir.path().join("EEGNet_curves.json").exists());
        assert!(dir.path().join("accuracy_table.json").exists());
        assert!(dir
            .path()
            .join("DeepConvNet_epoch_size=1, batch_size=4, learning_rate=0.01.svg")
            .exists());
    }
}
