pub mod gan;

pub use gan::{build_discriminator, build_generator, Gan, REAL_LABEL};
