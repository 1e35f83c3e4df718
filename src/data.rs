use mnist::MnistBuilder;

use crate::error::{Error, Result};
use crate::math::Matrix;
use crate::rng::RandomSource;

pub const IMAGE_SIDE: usize = 28;
pub const IMAGE_PIXELS: usize = IMAGE_SIDE * IMAGE_SIDE;
pub const NUM_CLASSES: usize = 10;

/// Which part of a dataset to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Training,
    Testing,
}

/// Produces an `(inputs, labels)` pair with one sample per row.
pub trait DatasetProvider {
    fn load(&self) -> Result<(Matrix, Matrix)>;
}

/// MNIST digits through the `mnist` crate.
///
/// Pixels are divided by 255 and rescaled into `[scale_min, scale_max]`.
/// Labels are one-hot over ten classes. When `filter` is non-empty only
/// those digits are kept.
#[derive(Debug, Clone)]
pub struct MnistProvider {
    pub split: Split,
    pub scale_min: f64,
    pub scale_max: f64,
    pub filter: Vec<usize>,
}

impl MnistProvider {
    pub fn new(split: Split) -> Self {
        Self {
            split,
            scale_min: 0.0,
            scale_max: 1.0,
            filter: Vec::new(),
        }
    }

    pub fn with_scale(mut self, min: f64, max: f64) -> Self {
        self.scale_min = min;
        self.scale_max = max;
        self
    }

    pub fn with_filter(mut self, digits: Vec<usize>) -> Self {
        self.filter = digits;
        self
    }

    fn keep(&self, digit: usize) -> bool {
        self.filter.is_empty() || self.filter.contains(&digit)
    }
}

impl DatasetProvider for MnistProvider {
    fn load(&self) -> Result<(Matrix, Matrix)> {
        if self.scale_min >= self.scale_max {
            return Err(Error::InvalidRange(format!(
                "scale range [{}, {}] is empty",
                self.scale_min, self.scale_max
            )));
        }
        let mnist = MnistBuilder::new()
            .label_format_digit()
            .training_set_length(60_000)
            .validation_set_length(0)
            .test_set_length(10_000)
            .download_and_extract()
            .finalize();
        let (images, labels) = match self.split {
            Split::Training => (mnist.trn_img, mnist.trn_lbl),
            Split::Testing => (mnist.tst_img, mnist.tst_lbl),
        };
        let (inputs, targets) = encode(
            &images,
            &labels,
            self.scale_min,
            self.scale_max,
            |d| self.keep(d),
        )?;
        log::info!(
            "Loaded {} MNIST {:?} samples",
            inputs.rows(),
            self.split
        );
        Ok((inputs, targets))
    }
}

/// Turn raw bytes and digit labels into scaled inputs and one-hot labels.
pub fn encode<F>(
    images: &[u8],
    labels: &[u8],
    min: f64,
    max: f64,
    keep: F,
) -> Result<(Matrix, Matrix)>
where
    F: Fn(usize) -> bool,
{
    if images.len() != labels.len() * IMAGE_PIXELS {
        return Err(Error::SizeMismatch {
            expected: labels.len() * IMAGE_PIXELS,
            actual: images.len(),
        });
    }
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut rows = 0;
    for (pixels, &label) in images.chunks(IMAGE_PIXELS).zip(labels.iter()) {
        let digit = label as usize;
        if digit >= NUM_CLASSES || !keep(digit) {
            continue;
        }
        xs.extend(
            pixels
                .iter()
                .map(|&p| min + (p as f64 / 255.0) * (max - min)),
        );
        ys.extend((0..NUM_CLASSES).map(|c| if c == digit { 1.0 } else { 0.0 }));
        rows += 1;
    }
    if rows == 0 {
        return Err(Error::InvalidConfig("no samples left after filtering".to_string()));
    }
    Ok((
        Matrix::from_vec(rows, IMAGE_PIXELS, xs)?,
        Matrix::from_vec(rows, NUM_CLASSES, ys)?,
    ))
}

/// Two linearly separable Gaussian clusters in the plane.
///
/// Class 0 is centred on `(-1, -1)`, class 1 on `(1, 1)`, both with standard
/// deviation 0.3. Labels are one-hot over two columns and the classes
/// alternate row by row.
pub fn two_blobs(n_per_class: usize, rng: &mut dyn RandomSource) -> Result<(Matrix, Matrix)> {
    let rows = n_per_class * 2;
    let mut xs = Vec::with_capacity(rows * 2);
    let mut ys = Vec::with_capacity(rows * 2);
    for _ in 0..n_per_class {
        for class in 0..2 {
            let centre = if class == 0 { -1.0 } else { 1.0 };
            xs.push(rng.normal(centre, 0.3));
            xs.push(rng.normal(centre, 0.3));
            ys.extend_from_slice(if class == 0 { &[1.0, 0.0] } else { &[0.0, 1.0] });
        }
    }
    Ok((Matrix::from_vec(rows, 2, xs)?, Matrix::from_vec(rows, 2, ys)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::StdRandom;

    #[test]
    fn encode_scales_and_one_hots() {
        let mut images = vec![0u8; IMAGE_PIXELS * 2];
        images[0] = 255;
        images[IMAGE_PIXELS] = 51;
        let labels = [3u8, 7u8];
        let (x, y) = encode(&images, &labels, -1.0, 1.0, |_| true).unwrap();
        assert_eq!(x.rows(), 2);
        assert!((x.get_at(0, 0).unwrap() - 1.0).abs() < 1e-12);
        assert!((x.get_at(0, 1).unwrap() + 1.0).abs() < 1e-12);
        assert!((x.get_at(1, 0).unwrap() + 0.6).abs() < 1e-12);
        assert_eq!(y.get_at(0, 3).unwrap(), 1.0);
        assert_eq!(y.get_at(1, 7).unwrap(), 1.0);
        assert_eq!(y.data().iter().sum::<f64>(), 2.0);
    }

    #[test]
    fn encode_applies_filter() {
        let images = vec![0u8; IMAGE_PIXELS * 3];
        let labels = [1u8, 2, 1];
        let (x, y) = encode(&images, &labels, 0.0, 1.0, |d| d == 1).unwrap();
        assert_eq!(x.rows(), 2);
        assert_eq!(y.argmax(), 1);
        assert!(encode(&images, &labels, 0.0, 1.0, |d| d == 9).is_err());
    }

    #[test]
    fn encode_rejects_truncated_images() {
        let images = vec![0u8; IMAGE_PIXELS - 1];
        assert!(matches!(
            encode(&images, &[0], 0.0, 1.0, |_| true),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn two_blobs_are_balanced() {
        let mut rng = StdRandom::seeded(3);
        let (x, y) = two_blobs(50, &mut rng).unwrap();
        assert_eq!((x.rows(), x.cols()), (100, 2));
        assert_eq!((y.rows(), y.cols()), (100, 2));
        let class1: f64 = (0..100).map(|r| y.get_at(r, 1).unwrap()).sum();
        assert_eq!(class1, 50.0);
    }
}
