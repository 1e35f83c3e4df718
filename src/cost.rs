use crate::error::Result;
use crate::math::Matrix;
use crate::EPSILON;

/// Scalar loss and its gradient with respect to the predictions.
pub trait Cost {
    fn name(&self) -> &str;

    /// Mean loss over every element of the batch.
    fn forward(&self, predictions: &Matrix, labels: &Matrix) -> Result<f64>;

    /// Gradient of the loss with respect to `predictions`.
    fn backward(&self, predictions: &Matrix, labels: &Matrix) -> Result<Matrix>;
}

/// Mean squared error.
///
/// The gradient is scaled by `2 / rows`, which is where the per-sample
/// normalisation of a dense layer's weight gradient comes from.
#[derive(Default, Clone, Copy)]
pub struct MeanSquaredError;

impl MeanSquaredError {
    pub fn new() -> Self {
        Self
    }
}

impl Cost for MeanSquaredError {
    fn name(&self) -> &str {
        "mean squared error"
    }

    fn forward(&self, predictions: &Matrix, labels: &Matrix) -> Result<f64> {
        let sq = Matrix::zip_map(predictions, labels, |p, l| (p - l) * (p - l))?;
        Ok(sq.average()[0])
    }

    fn backward(&self, predictions: &Matrix, labels: &Matrix) -> Result<Matrix> {
        let norm = 2.0 / predictions.rows() as f64;
        Matrix::zip_map(predictions, labels, |p, l| norm * (p - l))
    }
}

/// Binary cross-entropy for predictions in `(0, 1)`.
///
/// Predictions are clipped into `[EPSILON, 1 - EPSILON]` in both passes. The
/// gradient is not divided by the batch size.
#[derive(Default, Clone, Copy)]
pub struct BinaryCrossEntropy;

impl BinaryCrossEntropy {
    pub fn new() -> Self {
        Self
    }
}

fn clip(p: f64) -> f64 {
    p.clamp(EPSILON, 1.0 - EPSILON)
}

impl Cost for BinaryCrossEntropy {
    fn name(&self) -> &str {
        "binary cross entropy"
    }

    fn forward(&self, predictions: &Matrix, labels: &Matrix) -> Result<f64> {
        let losses = Matrix::zip_map(predictions, labels, |p, l| {
            let c = clip(p);
            -(l * c.ln() + (1.0 - l) * (1.0 - c).ln())
        })?;
        Ok(losses.average()[0])
    }

    fn backward(&self, predictions: &Matrix, labels: &Matrix) -> Result<Matrix> {
        Matrix::zip_map(predictions, labels, |p, l| {
            let c = clip(p);
            (c - l) / (c * (1.0 - c))
        })
    }
}
