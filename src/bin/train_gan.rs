use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;

use gannet::config::GanConfig;
use gannet::data::{DatasetProvider, MnistProvider, Split, IMAGE_PIXELS};
use gannet::logging::{log_total_ops, Callback, LogCallback, MetricsLogger};
use gannet::math;
use gannet::models::{build_discriminator, build_generator, Gan};
use gannet::optim::Adam;
use gannet::rng::rng_from_env;
use gannet::visual::{sample_grid, ImageSink, PngWriter};

const GRID: usize = 10;

/// Train a GAN on MNIST digits and write a sample sheet after every epoch.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML or JSON GAN config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Digits to train on, e.g. `--digits 3,7`; defaults to all
    #[arg(long, value_delimiter = ',')]
    digits: Vec<usize>,

    /// Override the number of epochs
    #[arg(long)]
    epochs: Option<usize>,

    /// Output directory for sample images
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// Directory for metric files
    #[arg(long)]
    log_dir: Option<String>,

    /// Experiment name under the log directory
    #[arg(long)]
    experiment: Option<String>,
}

fn timestamp_dir() -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!("gan-{secs}"))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => {
            GanConfig::from_path(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => GanConfig::default(),
    };
    if !args.digits.is_empty() {
        cfg.digits = args.digits.clone();
    }
    if let Some(epochs) = args.epochs {
        cfg.epochs = epochs;
    }
    cfg.validate()?;
    log::info!("GAN config: {:?}", cfg);

    let image_dir = args
        .image_dir
        .clone()
        .or_else(|| cfg.image_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(timestamp_dir);
    let mut sink = PngWriter::new(&image_dir)?;
    log::info!("Writing samples to {}", sink.dir().display());

    let (mut data, _) = MnistProvider::new(Split::Training)
        .with_scale(-1.0, 1.0)
        .with_filter(cfg.digits.clone())
        .load()?;

    let mut rng = rng_from_env();
    let adam = || Adam::with_betas(cfg.learning_rate, cfg.beta1, cfg.beta2);
    let generator = build_generator(cfg.noise_dim, IMAGE_PIXELS, adam()?, &mut rng)?;
    let discriminator = build_discriminator(IMAGE_PIXELS, adam()?, &mut rng)?;
    let mut gan = Gan::new(generator, discriminator, cfg.noise_dim)?;
    log::info!(
        "Generator {} params, discriminator {} params",
        gan.generator.parameter_count(),
        gan.discriminator.parameter_count()
    );

    let mut log_cb = LogCallback::new(1);
    let mut metrics = MetricsLogger::new(args.log_dir.clone(), args.experiment.clone())
        .map_err(|e| log::warn!("metrics disabled: {e}"))
        .ok();

    math::reset_matrix_ops();
    let pb = ProgressBar::new(cfg.epochs as u64);
    for epoch in 1..=cfg.epochs {
        let (d_loss, g_loss) = {
            let mut callbacks: Vec<&mut dyn Callback> = vec![&mut log_cb];
            if let Some(m) = metrics.as_mut() {
                callbacks.push(m);
            }
            gan.train_epoch(&mut data, cfg.batch_size, epoch, &mut rng, &mut callbacks)?
        };
        pb.println(format!(
            "Epoch {epoch} Discriminator Loss {d_loss:.3} Generator Loss {g_loss:.3}"
        ));
        let grid = sample_grid(&mut gan, GRID, GRID, &mut rng)?;
        sink.write(&epoch.to_string(), &grid)?;
        pb.inc(1);
    }
    pb.finish_with_message("done");
    if let Some(m) = metrics.as_mut() {
        m.on_train_end();
    }

    log_total_ops(math::matrix_ops_count());
    Ok(())
}
