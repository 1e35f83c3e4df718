use super::activation::Activation;
use super::layer::{Layer, LayerState};
use crate::error::{Error, Result};
use crate::math::Matrix;
use crate::rng::RandomSource;

pub const WEIGHTS: &str = "weights";

/// Fully connected layer without bias: `output = act(input · W)`.
///
/// `W` has shape `(input_dim, output_dim)` and starts Glorot-uniform in
/// `[-sqrt(6 / (in + out)), sqrt(6 / (in + out)))`.
pub struct DenseLayer {
    state: LayerState,
    input_dim: usize,
    output_dim: usize,
    activation: Option<Box<dyn Activation>>,
}

impl DenseLayer {
    pub fn new(
        input_dim: usize,
        output_dim: usize,
        activation: Option<Box<dyn Activation>>,
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        Self::with_name(input_dim, output_dim, activation, "dense", rng)
    }

    pub fn with_name<N: Into<String>>(
        input_dim: usize,
        output_dim: usize,
        activation: Option<Box<dyn Activation>>,
        name: N,
        rng: &mut dyn RandomSource,
    ) -> Result<Self> {
        if input_dim == 0 || output_dim == 0 {
            return Err(Error::InvalidDimension {
                rows: input_dim,
                cols: output_dim,
            });
        }
        let limit = (6.0 / (input_dim + output_dim) as f64).sqrt();
        let weights = Matrix::uniform(-limit, limit, input_dim, output_dim, rng)?;
        let mut state = LayerState::new(name);
        state.parameters.insert(WEIGHTS.to_string(), weights);
        Ok(Self {
            state,
            input_dim,
            output_dim,
            activation,
        })
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn activation(&self) -> Option<&dyn Activation> {
        self.activation.as_deref()
    }

    pub fn weights(&self) -> &Matrix {
        &self.state.parameters[WEIGHTS]
    }

    /// Replace the weight matrix, keeping the declared shape.
    pub fn set_weights(&mut self, weights: Matrix) -> Result<()> {
        if weights.rows() != self.input_dim || weights.cols() != self.output_dim {
            return Err(Error::ShapeMismatch(format!(
                "weights must be {}x{}, got {}x{}",
                self.input_dim,
                self.output_dim,
                weights.rows(),
                weights.cols()
            )));
        }
        self.state.parameters.insert(WEIGHTS.to_string(), weights);
        Ok(())
    }
}

impl Layer for DenseLayer {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn forward(&mut self, input: &Matrix) -> Result<Matrix> {
        let mut out = input.matmul(self.weights())?;
        if let Some(act) = self.activation.as_mut() {
            out = act.forward(&out);
        }
        self.state.input = Some(input.clone());
        self.state.output = Some(out.clone());
        Ok(out)
    }

    fn backward(&mut self, grad: &Matrix) -> Result<Matrix> {
        let input = self
            .state
            .input
            .as_ref()
            .ok_or_else(|| Error::BackwardBeforeForward(self.state.name.clone()))?;
        let grad = match self.activation.as_mut() {
            Some(act) => act.backward(grad)?,
            None => grad.clone(),
        };
        let input_grad = grad.matmul(&self.state.parameters[WEIGHTS].transpose())?;
        // Summed over the batch; any per-sample scaling comes from the cost.
        let weight_grad = input.transpose().matmul(&grad)?;
        self.state.gradients.insert(WEIGHTS.to_string(), weight_grad);
        self.state.input_gradient = Some(input_grad.clone());
        Ok(input_grad)
    }
}
