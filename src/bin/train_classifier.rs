use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use gannet::config::TrainingConfig;
use gannet::data::{DatasetProvider, MnistProvider, Split, IMAGE_PIXELS, NUM_CLASSES};
use gannet::logging::{log_total_ops, BatchEnd, Callback, EpochEnd, LogCallback, MetricsLogger};
use gannet::math;
use gannet::rng::rng_from_env;
use gannet::visual::render_ascii;

/// Train a two-layer MNIST classifier.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Built-in setup 1-6 (sigmoid / leaky ReLU / tanh with SGD, then with Adam)
    #[arg(long, default_value_t = 1)]
    preset: usize,

    /// TOML or JSON training config; overrides --preset
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log a batch line every N batches
    #[arg(long, default_value_t = 25)]
    log_every: usize,

    /// Directory for metric files
    #[arg(long)]
    log_dir: Option<String>,

    /// Experiment name under the log directory
    #[arg(long)]
    experiment: Option<String>,

    /// Print this many test digits as text with their predictions
    #[arg(long, default_value_t = 0)]
    show: usize,
}

/// Advances the progress bar once per batch.
struct Progress(ProgressBar);

impl Callback for Progress {
    fn on_batch_end(&mut self, event: &BatchEnd) {
        self.0.inc(1);
        self.0.set_message(format!("loss {}", event.loss));
    }

    fn on_epoch_end(&mut self, _event: &EpochEnd) {
        self.0.reset();
    }

    fn on_train_end(&mut self) {
        self.0.finish_and_clear();
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => TrainingConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => match TrainingConfig::preset(args.preset) {
            Some(cfg) => cfg,
            None => bail!("preset must be between 1 and 6, got {}", args.preset),
        },
    };
    log::info!("Training config: {:?}", cfg);

    let (min, max) = cfg.input_range();
    let (train_x, train_y) = MnistProvider::new(Split::Training)
        .with_scale(min, max)
        .load()?;
    let (test_x, test_y) = MnistProvider::new(Split::Testing)
        .with_scale(min, max)
        .load()?;

    let mut rng = rng_from_env();
    let mut model = cfg.build_model(IMAGE_PIXELS, NUM_CLASSES, &mut rng)?;

    let batches = (train_x.rows() / cfg.batch_size) as u64;
    let pb = ProgressBar::new(batches);
    pb.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let mut progress = Progress(pb);
    let mut log_cb = LogCallback::new(args.log_every);
    let mut metrics = MetricsLogger::new(args.log_dir.clone(), args.experiment.clone())
        .map_err(|e| log::warn!("metrics disabled: {e}"))
        .ok();

    math::reset_matrix_ops();
    {
        let mut callbacks: Vec<&mut dyn Callback> = vec![&mut log_cb, &mut progress];
        if let Some(m) = metrics.as_mut() {
            callbacks.push(m);
        }
        model.train(&train_x, &train_y, cfg.epochs, cfg.batch_size, &mut callbacks)?;
    }

    let accuracy = model.evaluate(&test_x, &test_y)?;
    log::info!("Test accuracy: {:.2}%", accuracy * 100.0);
    println!("Accuracy: {:.2}%", accuracy * 100.0);

    for row in 0..args.show.min(test_x.rows()) {
        let x = test_x.slice_rows(row, 1)?;
        let pred = model.predict(&x)?;
        println!("{}", render_ascii(x.data(), Some(min), Some(max))?);
        println!(
            "Predicted {} actual {}",
            pred.argmax(),
            test_y.slice_rows(row, 1)?.argmax()
        );
    }

    log_total_ops(math::matrix_ops_count());
    Ok(())
}
