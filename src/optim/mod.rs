pub mod adam;
pub mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

use crate::error::{Error, Result};
use crate::layers::Layer;
use crate::math::Matrix;

/// Parameter update rule consuming a layer's latest gradients.
pub trait Optimiser {
    fn name(&self) -> &str;

    fn learning_rate(&self) -> f64;

    /// Update every parameter of `layer` in place.
    fn update(&mut self, layer: &mut dyn Layer) -> Result<()>;
}

impl<T: Optimiser + ?Sized> Optimiser for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn learning_rate(&self) -> f64 {
        (**self).learning_rate()
    }

    fn update(&mut self, layer: &mut dyn Layer) -> Result<()> {
        (**self).update(layer)
    }
}

/// Look up the gradient matching parameter `name`.
pub(crate) fn gradient_for<'a>(layer: &'a dyn Layer, name: &str) -> Result<&'a Matrix> {
    layer
        .gradients()
        .get(name)
        .ok_or_else(|| Error::MissingGradient(format!("{}.{}", layer.name(), name)))
}

pub(crate) fn validate_learning_rate(lr: f64) -> Result<()> {
    if !(lr.is_finite() && lr > 0.0) {
        return Err(Error::InvalidConfig(format!(
            "learning rate must be finite and > 0, got {lr}"
        )));
    }
    Ok(())
}
