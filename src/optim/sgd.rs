use super::{gradient_for, validate_learning_rate, Optimiser};
use crate::error::Result;
use crate::layers::Layer;
use crate::math::Matrix;

/// Plain stochastic gradient descent: `w <- w - lr * g`.
pub struct Sgd {
    lr: f64,
}

impl Sgd {
    pub fn new(lr: f64) -> Result<Self> {
        validate_learning_rate(lr)?;
        Ok(Self { lr })
    }
}

impl Optimiser for Sgd {
    fn name(&self) -> &str {
        "stochastic gradient descent"
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn update(&mut self, layer: &mut dyn Layer) -> Result<()> {
        let lr = self.lr;
        let names: Vec<String> = layer.parameters().keys().cloned().collect();
        for name in names {
            let updated = {
                let grad = gradient_for(layer, &name)?;
                Matrix::zip_map(&layer.parameters()[&name], grad, |w, g| w - lr * g)?
            };
            layer.state_mut().parameters.insert(name, updated);
        }
        Ok(())
    }
}
