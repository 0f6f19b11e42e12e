//! dl_labs CLI
//!
//! Entry point for the EEG activation comparison and the GAN evaluation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use dl_labs::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use dl_labs::gan::{run_gan_evaluation, GanEvalConfig};
use dl_labs::model::ExperimentConfig;
use dl_labs::training::run_eeg_experiment;
use dl_labs::utils::logging::{init_logging, LogConfig};

/// Deep-learning lab experiments with Burn
#[derive(Parser, Debug)]
#[command(name = "dl_labs")]
#[command(version)]
#[command(about = "EEG classifier comparison and GAN evaluation with Burn", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train EEGNet and DeepConvNet with every activation and compare them
    Eeg {
        /// Number of training epochs
        #[arg(short, long, default_value = "300")]
        epochs: usize,

        /// Batch size for training
        #[arg(short, long, default_value = "64")]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.01")]
        learning_rate: f64,

        /// Directory with train/test data and label CSVs
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Output directory for charts and JSON results
        #[arg(short, long, default_value = "output")]
        output_dir: PathBuf,

        /// JSON experiment config; overrides the flags above
        #[arg(long)]
        config: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long, default_value = "false")]
        no_progress: bool,
    },

    /// Score a trained conditional generator on the test condition sets
    GanEval {
        /// Directory with objects.json and the condition files
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,

        /// Directory holding the generator checkpoints
        #[arg(short, long, default_value = "models")]
        models_dir: PathBuf,

        /// Where the image grids are written
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Condition embedding size of the checkpoint
        #[arg(long, default_value = "200")]
        c_dim: usize,

        /// Generator steps per discriminator step of the checkpoint
        #[arg(long, default_value = "4")]
        g_times: usize,

        /// Checkpoint epoch
        #[arg(long, default_value = "189")]
        epoch: usize,

        /// Checkpoint score
        #[arg(long, default_value = "0.72")]
        score: f64,

        /// Evaluator checkpoint
        #[arg(long, default_value = "models/evaluator.mpk")]
        evaluator: PathBuf,

        /// JSON GAN evaluation config; overrides the flags above
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let _ = init_logging(&log_config);

    print_banner();

    let device = default_device();
    info!("Backend: {}", backend_name());

    match cli.command {
        Commands::Eeg {
            epochs,
            batch_size,
            learning_rate,
            data_dir,
            output_dir,
            config,
            no_progress,
        } => {
            let config = match config {
                Some(path) => ExperimentConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => ExperimentConfig {
                    epochs,
                    batch_size,
                    learning_rate,
                    data_dir,
                    output_dir,
                    show_progress: !no_progress,
                    ..ExperimentConfig::default()
                },
            };

            run_eeg_experiment::<TrainingBackend>(&config, &device)?;
            println!(
                "{} results written to {}",
                "Done:".green().bold(),
                config.output_dir.display()
            );
        }

        Commands::GanEval {
            data_dir,
            models_dir,
            output_dir,
            c_dim,
            g_times,
            epoch,
            score,
            evaluator,
            config,
        } => {
            let config = match config {
                Some(path) => GanEvalConfig::load(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => GanEvalConfig {
                    data_dir,
                    models_dir,
                    output_dir,
                    c_dim,
                    g_times,
                    epoch,
                    score,
                    evaluator_checkpoint: evaluator,
                    ..GanEvalConfig::default()
                },
            };

            let scores = run_gan_evaluation::<DefaultBackend>(&config, &device)?;
            for result in scores {
                println!(
                    "{} {:.6}  ({})",
                    format!("{}:", result.label).cyan().bold(),
                    result.score,
                    result.image.display()
                );
            }
        }
    }

    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        r#"
 +------------------------------------------------+
 |   dl_labs                                      |
 |   EEG classification and GAN evaluation        |
 +------------------------------------------------+
  "#
        .green()
    );
}
