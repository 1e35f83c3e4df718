use super::activation::Activation;
use crate::error::{Error, Result};
use crate::math::Matrix;

/// Hyperbolic tangent activation.
#[derive(Default)]
pub struct Tanh {
    output: Option<Matrix>,
}

impl Tanh {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Activation for Tanh {
    fn name(&self) -> &str {
        "tanh"
    }

    fn forward(&mut self, input: &Matrix) -> Matrix {
        let out = input.map(f64::tanh);
        self.output = Some(out.clone());
        out
    }

    fn backward(&mut self, grad: &Matrix) -> Result<Matrix> {
        let out = self
            .output
            .as_ref()
            .ok_or_else(|| Error::BackwardBeforeForward(self.name().to_string()))?;
        Matrix::zip_map(grad, out, |g, h| g * (1.0 - h * h))
    }

    fn output(&self) -> Option<&Matrix> {
        self.output.as_ref()
    }
}
