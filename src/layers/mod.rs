pub mod activation;
pub mod dense;
pub mod layer;
pub mod leaky_relu;
pub mod sigmoid;
pub mod tanh;

pub use activation::Activation;
pub use dense::DenseLayer;
pub use layer::{Layer, LayerId, LayerState};
pub use leaky_relu::LeakyRelu;
pub use sigmoid::Sigmoid;
pub use tanh::Tanh;
