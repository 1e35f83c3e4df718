use std::collections::HashMap;

use super::{gradient_for, validate_learning_rate, Optimiser};
use crate::error::{Error, Result};
use crate::layers::{Layer, LayerId};
use crate::math::Matrix;
use crate::EPSILON;

pub const DEFAULT_BETA1: f64 = 0.9;
pub const DEFAULT_BETA2: f64 = 0.999;

/// Adam with bias correction folded into the step size.
///
/// Moments are created lazily per `(layer id, parameter name)`. The
/// iteration counter is global to the optimiser and advances once per
/// [`Optimiser::update`] call, however many parameters that call touches.
pub struct Adam {
    lr: f64,
    beta1: f64,
    beta2: f64,
    iteration: u64,
    m: HashMap<(LayerId, String), Matrix>,
    v: HashMap<(LayerId, String), Matrix>,
}

impl Adam {
    pub fn new(lr: f64) -> Result<Self> {
        Self::with_betas(lr, DEFAULT_BETA1, DEFAULT_BETA2)
    }

    pub fn with_betas(lr: f64, beta1: f64, beta2: f64) -> Result<Self> {
        validate_learning_rate(lr)?;
        for (label, beta) in [("beta1", beta1), ("beta2", beta2)] {
            if !(beta.is_finite() && (0.0..1.0).contains(&beta)) {
                return Err(Error::InvalidConfig(format!(
                    "adam {label} must be finite and in [0,1), got {beta}"
                )));
            }
        }
        Ok(Self {
            lr,
            beta1,
            beta2,
            iteration: 0,
            m: HashMap::new(),
            v: HashMap::new(),
        })
    }

    pub fn beta1(&self) -> f64 {
        self.beta1
    }

    pub fn beta2(&self) -> f64 {
        self.beta2
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// First and second moments stored for a parameter, if any.
    pub fn moments(&self, layer: LayerId, param: &str) -> Option<(&Matrix, &Matrix)> {
        let key = (layer, param.to_string());
        Some((self.m.get(&key)?, self.v.get(&key)?))
    }

    /// `lr * sqrt(1 - beta2^t) / (1 - beta1^t)` for the current iteration,
    /// or `None` before the first update.
    pub fn effective_learning_rate(&self) -> Option<f64> {
        (self.iteration > 0).then(|| self.step_size(self.iteration))
    }

    fn step_size(&self, t: u64) -> f64 {
        let t = t as i32;
        self.lr * (1.0 - self.beta2.powi(t)).sqrt() / (1.0 - self.beta1.powi(t))
    }
}

impl Optimiser for Adam {
    fn name(&self) -> &str {
        "adam"
    }

    fn learning_rate(&self) -> f64 {
        self.lr
    }

    fn update(&mut self, layer: &mut dyn Layer) -> Result<()> {
        self.iteration += 1;
        let (beta1, beta2) = (self.beta1, self.beta2);
        let lr_t = self.step_size(self.iteration);
        let id = layer.id();

        let names: Vec<String> = layer.parameters().keys().cloned().collect();
        for name in names {
            let updated = {
                let weights = &layer.parameters()[&name];
                let grad = gradient_for(layer, &name)?;
                let key = (id, name.clone());

                let zeros = || Matrix::zeros(weights.rows(), weights.cols());
                let m_prev = match self.m.get(&key) {
                    Some(m) => m.clone(),
                    None => zeros()?,
                };
                let v_prev = match self.v.get(&key) {
                    Some(v) => v.clone(),
                    None => zeros()?,
                };

                let m = Matrix::zip_map(&m_prev, grad, |m, g| beta1 * m + (1.0 - beta1) * g)?;
                let v = Matrix::zip_map(&v_prev, grad, |v, g| beta2 * v + (1.0 - beta2) * g * g)?;
                let w = Matrix::zip3_map(weights, &m, &v, |w, m, v| {
                    w - lr_t * m / (v.sqrt() + EPSILON)
                })?;
                self.m.insert(key.clone(), m);
                self.v.insert(key, v);
                w
            };
            layer.state_mut().parameters.insert(name, updated);
        }
        Ok(())
    }
}
