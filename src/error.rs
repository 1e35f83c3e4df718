/// Errors raised by matrix operations, layers, costs and optimisers.
///
/// All of these are caller errors detected at the offending call. Nothing in
/// the crate retries or recovers from them; training aborts on the first one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid dimension {rows}x{cols}: rows and columns must be positive")]
    InvalidDimension { rows: usize, cols: usize },

    #[error("index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("size mismatch: expected {expected} elements, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("backward called before forward on {0}")]
    BackwardBeforeForward(String),

    #[error("no gradient computed for parameter {0}")]
    MissingGradient(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
