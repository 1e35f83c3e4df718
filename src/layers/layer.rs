use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use crate::error::Result;
use crate::math::Matrix;

/// Stable identity of a layer, assigned once at construction.
///
/// Optimisers key their per-parameter state by this id rather than by the
/// layer name, so two layers that share a name never share state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(Uuid);

impl LayerId {
    pub fn new() -> Self {
        LayerId(Uuid::new_v4())
    }
}

impl Default for LayerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Bookkeeping shared by every layer: learnable parameters, their latest
/// gradients and the matrices cached by the last forward/backward call.
pub struct LayerState {
    pub id: LayerId,
    pub name: String,
    pub parameters: BTreeMap<String, Matrix>,
    pub gradients: BTreeMap<String, Matrix>,
    pub input: Option<Matrix>,
    pub output: Option<Matrix>,
    pub input_gradient: Option<Matrix>,
}

impl LayerState {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self {
            id: LayerId::new(),
            name: name.into(),
            parameters: BTreeMap::new(),
            gradients: BTreeMap::new(),
            input: None,
            output: None,
            input_gradient: None,
        }
    }
}

/// Common interface for network layers.
pub trait Layer {
    fn state(&self) -> &LayerState;

    fn state_mut(&mut self) -> &mut LayerState;

    /// Forward pass. Caches the input and output.
    fn forward(&mut self, input: &Matrix) -> Result<Matrix>;

    /// Backward pass. Stores parameter gradients and returns the gradient
    /// with respect to the layer input.
    fn backward(&mut self, grad: &Matrix) -> Result<Matrix>;

    fn id(&self) -> LayerId {
        self.state().id
    }

    fn name(&self) -> &str {
        &self.state().name
    }

    fn parameters(&self) -> &BTreeMap<String, Matrix> {
        &self.state().parameters
    }

    fn gradients(&self) -> &BTreeMap<String, Matrix> {
        &self.state().gradients
    }

    fn input(&self) -> Option<&Matrix> {
        self.state().input.as_ref()
    }

    fn output(&self) -> Option<&Matrix> {
        self.state().output.as_ref()
    }

    fn input_gradient(&self) -> Option<&Matrix> {
        self.state().input_gradient.as_ref()
    }

    /// Total number of learnable scalars.
    fn parameter_count(&self) -> usize {
        self.state().parameters.values().map(Matrix::len).sum()
    }
}
