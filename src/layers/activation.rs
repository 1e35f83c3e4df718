use crate::error::Result;
use crate::math::Matrix;

/// Elementwise non-linearity applied after a layer's weighted sum.
///
/// `forward` caches its output so that `backward` can compute the local
/// derivative from it. Calling `backward` without a prior `forward` fails
/// with `BackwardBeforeForward`.
pub trait Activation {
    fn name(&self) -> &str;

    fn forward(&mut self, input: &Matrix) -> Matrix;

    /// Multiply the upstream gradient by the derivative of the activation.
    fn backward(&mut self, grad: &Matrix) -> Result<Matrix>;

    /// Output of the last forward call.
    fn output(&self) -> Option<&Matrix>;
}
