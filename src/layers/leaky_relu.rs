use super::activation::Activation;
use crate::error::{Error, Result};
use crate::math::Matrix;

/// Leaky ReLU: `x` for positive inputs, `alpha * x` otherwise.
///
/// An `alpha` of zero gives a plain ReLU.
pub struct LeakyRelu {
    alpha: f64,
    name: String,
    output: Option<Matrix>,
}

impl LeakyRelu {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha,
            name: format!("leaky_relu ({alpha})"),
            output: None,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Activation for LeakyRelu {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&mut self, input: &Matrix) -> Matrix {
        let alpha = self.alpha;
        let out = input.map(|x| if x > 0.0 { x } else { alpha * x });
        self.output = Some(out.clone());
        out
    }

    fn backward(&mut self, grad: &Matrix) -> Result<Matrix> {
        let alpha = self.alpha;
        let out = self
            .output
            .as_ref()
            .ok_or_else(|| Error::BackwardBeforeForward(self.name.clone()))?;
        Matrix::zip_map(grad, out, |g, h| g * if h > 0.0 { 1.0 } else { alpha })
    }

    fn output(&self) -> Option<&Matrix> {
        self.output.as_ref()
    }
}
