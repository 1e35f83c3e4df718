use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, Luma};

use crate::data::{IMAGE_PIXELS, IMAGE_SIDE};
use crate::math::Matrix;
use crate::models::Gan;
use crate::rng::RandomSource;

/// Side length of one grid cell; samples sit at offset 1 inside it.
pub const CELL: usize = 30;

const ASCII_RAMP: [char; 10] = [' ', '.', '~', '\'', ':', '-', '+', '%', '#', '*'];

#[derive(Debug, thiserror::Error)]
pub enum VisualError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("bad sample shape: {0}")]
    Shape(String),

    #[error(transparent)]
    Model(#[from] crate::error::Error),
}

/// Destination for grayscale intensity grids in `[0, 1]`, indexed
/// `[row][col]`.
pub trait ImageSink {
    fn write(&mut self, name: &str, pixels: &[Vec<f64>]) -> Result<(), VisualError>;
}

/// Writes `<dir>/<name>.png` grayscale images.
pub struct PngWriter {
    dir: PathBuf,
}

impl PngWriter {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, VisualError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageSink for PngWriter {
    fn write(&mut self, name: &str, pixels: &[Vec<f64>]) -> Result<(), VisualError> {
        let height = pixels.len();
        let width = pixels.first().map_or(0, |r| r.len());
        if height == 0 || width == 0 || pixels.iter().any(|r| r.len() != width) {
            return Err(VisualError::Shape(
                "pixel grid must be non-empty and rectangular".to_string(),
            ));
        }
        let mut img = GrayImage::new(width as u32, height as u32);
        for (y, row) in pixels.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                let level = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
                img.put_pixel(x as u32, y as u32, Luma([level]));
            }
        }
        let path = self.dir.join(format!("{name}.png"));
        img.save(&path)?;
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

/// Lay out the first `grid_rows * grid_cols` samples (28x28, values in
/// `[-1, 1]`) on a black canvas of 30-pixel cells, mapped into `[0, 1]`.
pub fn tile_samples(
    samples: &Matrix,
    grid_rows: usize,
    grid_cols: usize,
) -> Result<Vec<Vec<f64>>, VisualError> {
    if samples.cols() != IMAGE_PIXELS {
        return Err(VisualError::Shape(format!(
            "expected {IMAGE_PIXELS} columns, got {}",
            samples.cols()
        )));
    }
    let count = grid_rows * grid_cols;
    if count == 0 || samples.rows() < count {
        return Err(VisualError::Shape(format!(
            "{} samples cannot fill a {grid_rows}x{grid_cols} grid",
            samples.rows()
        )));
    }
    let mut canvas = vec![vec![0.0; grid_cols * CELL]; grid_rows * CELL];
    for k in 0..count {
        let top = (k / grid_cols) * CELL + 1;
        let left = (k % grid_cols) * CELL + 1;
        let base = k * IMAGE_PIXELS;
        for y in 0..IMAGE_SIDE {
            for x in 0..IMAGE_SIDE {
                let v = samples[base + y * IMAGE_SIDE + x];
                canvas[top + y][left + x] = ((v + 1.0) / 2.0).clamp(0.0, 1.0);
            }
        }
    }
    Ok(canvas)
}

/// Generate a fresh `grid_rows x grid_cols` sheet of samples from `gan`.
pub fn sample_grid(
    gan: &mut Gan,
    grid_rows: usize,
    grid_cols: usize,
    rng: &mut dyn RandomSource,
) -> Result<Vec<Vec<f64>>, VisualError> {
    let samples = gan.generate(grid_rows * grid_cols, rng)?;
    tile_samples(&samples, grid_rows, grid_cols)
}

/// Render one 28x28 sample as text, ten characters from dark to bright.
///
/// Intensities are normalised with `min`/`max`, defaulting to the sample's
/// own extremes.
pub fn render_ascii(
    sample: &[f64],
    min: Option<f64>,
    max: Option<f64>,
) -> Result<String, VisualError> {
    if sample.len() != IMAGE_PIXELS {
        return Err(VisualError::Shape(format!(
            "expected {IMAGE_PIXELS} values, got {}",
            sample.len()
        )));
    }
    let lo = min.unwrap_or_else(|| sample.iter().cloned().fold(f64::INFINITY, f64::min));
    let hi = max.unwrap_or_else(|| sample.iter().cloned().fold(f64::NEG_INFINITY, f64::max));
    let scale = if hi > lo { hi - lo } else { 1.0 };

    let mut out = String::with_capacity(IMAGE_PIXELS + IMAGE_SIDE);
    for row in sample.chunks(IMAGE_SIDE) {
        for &v in row {
            let d = (v - lo) / scale;
            let idx = ((d * 10.0).floor().max(0.0) as usize).min(ASCII_RAMP.len() - 1);
            out.push(ASCII_RAMP[idx]);
        }
        out.push('\n');
    }
    Ok(out)
}
