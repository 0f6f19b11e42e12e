//! Logging Module
//!
//! Structured logging through the `tracing` crate, plus an epoch logger used
//! by the multi-model training loop.

use std::time::Instant;

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: LogLevel,
    /// Whether to include target (module path)
    pub include_target: bool,
    /// Whether to include thread IDs
    pub include_thread_ids: bool,
    /// Whether to use ANSI colors
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_target: false,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    /// Verbose logging for debugging
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            include_target: true,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }
}

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Install the global tracing subscriber
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.level.to_tracing_level())
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Per-epoch logger for a set of models trained in lockstep
pub struct EpochLogger {
    family: String,
    total_epochs: usize,
    epoch: usize,
    epoch_start: Instant,
    run_start: Instant,
}

impl EpochLogger {
    pub fn new(family: &str, total_epochs: usize) -> Self {
        Self {
            family: family.to_string(),
            total_epochs,
            epoch: 0,
            epoch_start: Instant::now(),
            run_start: Instant::now(),
        }
    }

    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = Instant::now();
        tracing::debug!("{}: epoch {}/{} started", self.family, epoch + 1, self.total_epochs);
    }

    /// Log one model's accuracies for the current epoch
    pub fn log_model(&self, model: &str, train_acc: f64, test_acc: f64) {
        tracing::debug!(
            "{} [{}] epoch {}/{} | train {:.2}% | test {:.2}%",
            self.family,
            model,
            self.epoch + 1,
            self.total_epochs,
            train_acc,
            test_acc
        );
    }

    pub fn end_epoch(&self) {
        let elapsed = self.epoch_start.elapsed().as_secs_f64();
        let done = self.epoch + 1;
        let avg = self.run_start.elapsed().as_secs_f64() / done as f64;
        let eta = avg * self.total_epochs.saturating_sub(done) as f64;
        tracing::info!(
            "{}: epoch {}/{} done in {:.2}s, ETA {}",
            self.family,
            done,
            self.total_epochs,
            elapsed,
            super::format_duration(eta)
        );
    }

    pub fn finish(&self) {
        tracing::info!(
            "{}: {} epochs finished in {}",
            self.family,
            self.total_epochs,
            super::format_duration(self.run_start.elapsed().as_secs_f64())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_presets() {
        assert_eq!(LogConfig::default().level, LogLevel::Info);
        assert_eq!(LogConfig::verbose().level, LogLevel::Debug);
        assert_eq!(LogConfig::verbose().level.to_tracing_level(), Level::DEBUG);
    }

    #[test]
    fn test_epoch_logger_tracks_epoch() {
        let mut logger = EpochLogger::new("EEGNet", 3);
        logger.start_epoch(1);
        assert_eq!(logger.epoch, 1);
        logger.log_model("relu", 50.0, 40.0);
        logger.end_epoch();
    }
}
