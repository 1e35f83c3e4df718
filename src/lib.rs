pub mod config;
pub mod cost;
pub mod data;
pub mod error;
pub mod layers;
pub mod logging;
pub mod math;
pub mod model;
pub mod models;
pub mod optim;
pub mod rng;
pub mod visual;

pub use error::{Error, Result};
pub use math::Matrix;
pub use model::Model;

/// Clipping margin for probabilities fed to logarithms.
pub const EPSILON: f64 = 1e-7;
