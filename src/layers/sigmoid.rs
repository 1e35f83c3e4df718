use super::activation::Activation;
use crate::error::{Error, Result};
use crate::math::Matrix;

/// Logistic activation, `exp(x) / (1 + exp(x))`.
#[derive(Default)]
pub struct Sigmoid {
    output: Option<Matrix>,
}

impl Sigmoid {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Activation for Sigmoid {
    fn name(&self) -> &str {
        "sigmoid"
    }

    fn forward(&mut self, input: &Matrix) -> Matrix {
        let out = input.map(|x| {
            let e = x.exp();
            // exp overflows to inf well before the ratio leaves 1.0.
            if e.is_infinite() {
                1.0
            } else {
                e / (1.0 + e)
            }
        });
        self.output = Some(out.clone());
        out
    }

    fn backward(&mut self, grad: &Matrix) -> Result<Matrix> {
        let out = self
            .output
            .as_ref()
            .ok_or_else(|| Error::BackwardBeforeForward(self.name().to_string()))?;
        Matrix::zip_map(grad, out, |g, h| g * h * (1.0 - h))
    }

    fn output(&self) -> Option<&Matrix> {
        self.output.as_ref()
    }
}
