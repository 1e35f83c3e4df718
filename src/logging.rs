use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use csv::Writer;
use serde::Serialize;

/// Emitted after every mini-batch. Epoch and batch numbers are 1-based and
/// the loss is rounded to three decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchEnd {
    pub epoch: usize,
    pub batch: usize,
    pub loss: f64,
}

/// Emitted after every epoch with the rounded mean batch loss.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochEnd {
    pub epoch: usize,
    pub loss: f64,
}

/// Losses reported by one adversarial training step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GanStep {
    pub epoch: usize,
    pub step: usize,
    pub discriminator_loss: f64,
    pub generator_loss: f64,
}

/// Observer hooked into the training loop. Purely observational: nothing a
/// callback does feeds back into training.
pub trait Callback {
    /// Called once before training starts.
    fn on_train_begin(&mut self) {}

    /// Called after each batch.
    fn on_batch_end(&mut self, _event: &BatchEnd) {}

    /// Called after each epoch.
    fn on_epoch_end(&mut self, _event: &EpochEnd) {}

    /// Called after each adversarial step.
    fn on_gan_step(&mut self, _event: &GanStep) {}

    /// Called once after training ends.
    fn on_train_end(&mut self) {}
}

/// Round to three decimals, the precision used in reported losses.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

pub fn format_batch_end(e: &BatchEnd) -> String {
    format!("Epoch {} Batch {} Loss {}.", e.epoch, e.batch, e.loss)
}

pub fn format_epoch_end(e: &EpochEnd) -> String {
    format!("Epoch {} Loss {}", e.epoch, e.loss)
}

pub fn format_gan_step(e: &GanStep) -> String {
    format!(
        "Epoch {} Step {} Discriminator Loss {:.3} Generator Loss {:.3}",
        e.epoch, e.step, e.discriminator_loss, e.generator_loss
    )
}

pub fn format_total_ops(count: usize) -> String {
    format!("Total matrix ops: {}", count)
}

/// Log the total number of matrix operations at info level.
pub fn log_total_ops(count: usize) {
    log::info!("{}", format_total_ops(count));
}

/// Writes batch and epoch events through the `log` facade.
///
/// Batch events are logged at info level every `batch_interval` batches and
/// at debug level otherwise.
pub struct LogCallback {
    batch_interval: usize,
}

impl LogCallback {
    pub fn new(batch_interval: usize) -> Self {
        Self {
            batch_interval: batch_interval.max(1),
        }
    }
}

impl Callback for LogCallback {
    fn on_batch_end(&mut self, event: &BatchEnd) {
        if event.batch % self.batch_interval == 0 {
            log::info!("{}", format_batch_end(event));
        } else {
            log::debug!("{}", format_batch_end(event));
        }
    }

    fn on_epoch_end(&mut self, event: &EpochEnd) {
        log::info!("{}", format_epoch_end(event));
    }

    fn on_gan_step(&mut self, event: &GanStep) {
        log::info!("{}", format_gan_step(event));
    }
}

/// Collects every event it sees.
#[derive(Default)]
pub struct LossHistory {
    pub batches: Vec<BatchEnd>,
    pub epochs: Vec<EpochEnd>,
    pub gan_steps: Vec<GanStep>,
}

impl LossHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Callback for LossHistory {
    fn on_batch_end(&mut self, event: &BatchEnd) {
        self.batches.push(*event);
    }

    fn on_epoch_end(&mut self, event: &EpochEnd) {
        self.epochs.push(*event);
    }

    fn on_gan_step(&mut self, event: &GanStep) {
        self.gan_steps.push(*event);
    }
}

#[derive(Serialize)]
pub struct MetricRecord {
    pub kind: &'static str,
    pub epoch: usize,
    pub step: usize,
    pub loss: f64,
    pub aux_loss: Option<f64>,
}

/// Appends metric records to `metrics.jsonl` and `metrics.csv` inside
/// `<log_dir>/<experiment>`.
pub struct MetricsLogger {
    dir: PathBuf,
    json: File,
    csv: Writer<File>,
}

fn append_to(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn run_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("run-{secs}")
}

impl MetricsLogger {
    /// Open (or continue) the metric files of `experiment` under `log_dir`.
    /// Defaults are `runs/` and a `run-<unix seconds>` name.
    pub fn new(log_dir: Option<String>, experiment: Option<String>) -> std::io::Result<Self> {
        let dir = PathBuf::from(log_dir.as_deref().unwrap_or("runs"))
            .join(experiment.unwrap_or_else(run_name));
        std::fs::create_dir_all(&dir)?;
        let json = append_to(&dir.join("metrics.jsonl"))?;
        let csv = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(append_to(&dir.join("metrics.csv"))?);
        Ok(Self { dir, json, csv })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log<T: Serialize>(&mut self, metrics: &T) {
        match serde_json::to_string(metrics) {
            Ok(line) => {
                if let Err(e) = writeln!(self.json, "{}", line) {
                    log::warn!("failed to write metrics line: {e}");
                }
            }
            Err(e) => log::warn!("failed to serialise metrics: {e}"),
        }
        if let Err(e) = self.csv.serialize(metrics) {
            log::warn!("failed to write metrics csv: {e}");
        }
    }
}

impl Callback for MetricsLogger {
    fn on_batch_end(&mut self, event: &BatchEnd) {
        self.log(&MetricRecord {
            kind: "batch",
            epoch: event.epoch,
            step: event.batch,
            loss: event.loss,
            aux_loss: None,
        });
    }

    fn on_epoch_end(&mut self, event: &EpochEnd) {
        self.log(&MetricRecord {
            kind: "epoch",
            epoch: event.epoch,
            step: 0,
            loss: event.loss,
            aux_loss: None,
        });
    }

    fn on_gan_step(&mut self, event: &GanStep) {
        self.log(&MetricRecord {
            kind: "gan",
            epoch: event.epoch,
            step: event.step,
            loss: event.discriminator_loss,
            aux_loss: Some(event.generator_loss),
        });
    }

    fn on_train_end(&mut self) {
        if let Err(e) = self.csv.flush() {
            log::warn!("failed to flush metrics csv: {e}");
        }
    }
}
