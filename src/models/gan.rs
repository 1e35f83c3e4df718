use crate::cost::BinaryCrossEntropy;
use crate::error::{Error, Result};
use crate::layers::{Activation, DenseLayer, LeakyRelu, Sigmoid, Tanh};
use crate::logging::{Callback, GanStep};
use crate::math::Matrix;
use crate::model::Model;
use crate::optim::Optimiser;
use crate::rng::RandomSource;

/// Target used for real samples when training the discriminator. Slightly
/// below one (label smoothing).
pub const REAL_LABEL: f64 = 0.9;

/// Generator and discriminator trained in alternation.
///
/// The two models keep their own optimisers. The generator's only learning
/// signal is the gradient the discriminator hands back with respect to its
/// input.
pub struct Gan {
    pub generator: Model,
    pub discriminator: Model,
    noise_dim: usize,
}

impl Gan {
    pub fn new(generator: Model, discriminator: Model, noise_dim: usize) -> Result<Self> {
        if noise_dim == 0 {
            return Err(Error::InvalidConfig("noise_dim must be > 0".to_string()));
        }
        Ok(Self {
            generator,
            discriminator,
            noise_dim,
        })
    }

    pub fn noise_dim(&self) -> usize {
        self.noise_dim
    }

    /// Standard normal latent vectors, one per row.
    pub fn noise(&self, count: usize, rng: &mut dyn RandomSource) -> Result<Matrix> {
        Matrix::normal(0.0, 1.0, count, self.noise_dim, rng)
    }

    /// Generate `count` samples from fresh noise.
    pub fn generate(&mut self, count: usize, rng: &mut dyn RandomSource) -> Result<Matrix> {
        let noise = self.noise(count, rng)?;
        self.generator.predict(&noise)
    }

    /// One discriminator update on `real` (target [`REAL_LABEL`]) followed by
    /// one on as many generated samples (target 0). Returns the mean of the
    /// two losses.
    pub fn train_discriminator(
        &mut self,
        real: &Matrix,
        rng: &mut dyn RandomSource,
    ) -> Result<f64> {
        let count = real.rows();
        let real_labels = Matrix::filled(REAL_LABEL, count, 1)?;
        let real_loss = self.discriminator.train_on_batch(real, &real_labels)?;

        let fake = self.generate(count, rng)?;
        let fake_labels = Matrix::zeros(count, 1)?;
        let fake_loss = self.discriminator.train_on_batch(&fake, &fake_labels)?;

        Ok((real_loss + fake_loss) / 2.0)
    }

    /// One generator update through the frozen discriminator.
    ///
    /// The discriminator runs forward and backward so that its first layer
    /// produces an input gradient, but its parameters are left untouched.
    pub fn train_generator(&mut self, batch_size: usize, rng: &mut dyn RandomSource) -> Result<f64> {
        let noise = self.noise(batch_size, rng)?;
        let forged_labels = Matrix::ones(batch_size, 1)?;

        let generated = self.generator.forward(&noise)?;
        let judged = self.discriminator.forward(&generated)?;
        let loss = self.discriminator.cost().forward(&judged, &forged_labels)?;
        let grad = self.discriminator.cost().backward(&judged, &forged_labels)?;

        let grad_generated = self.discriminator.backward(&grad)?;
        self.generator.backward(&grad_generated)?;
        self.generator.update_parameters()?;
        Ok(loss)
    }

    /// Discriminator step on `half_batch` real rows from a random offset, then
    /// a generator step on `batch_size` noise rows.
    pub fn train_step(
        &mut self,
        data: &Matrix,
        batch_size: usize,
        rng: &mut dyn RandomSource,
    ) -> Result<(f64, f64)> {
        let half_batch = batch_size / 2;
        if half_batch == 0 || half_batch > data.rows() {
            return Err(Error::InvalidRange(format!(
                "batch size {batch_size} does not fit {} rows",
                data.rows()
            )));
        }
        let start = rng.uniform_int(0, data.rows() - half_batch);
        let real = data.slice_rows(start, half_batch)?;
        let d_loss = self.train_discriminator(&real, rng)?;
        let g_loss = self.train_generator(batch_size, rng)?;
        Ok((d_loss, g_loss))
    }

    /// Shuffle `data` and run `ceil(rows / batch_size)` adversarial steps.
    /// Returns the mean discriminator and generator losses.
    pub fn train_epoch(
        &mut self,
        data: &mut Matrix,
        batch_size: usize,
        epoch: usize,
        rng: &mut dyn RandomSource,
        callbacks: &mut [&mut dyn Callback],
    ) -> Result<(f64, f64)> {
        if batch_size == 0 {
            return Err(Error::InvalidRange("batch size must be > 0".to_string()));
        }
        data.shuffle_rows(rng);
        let steps = data.rows().div_ceil(batch_size);
        let (mut d_sum, mut g_sum) = (0.0, 0.0);
        for step in 1..=steps {
            let (d_loss, g_loss) = self.train_step(data, batch_size, rng)?;
            d_sum += d_loss;
            g_sum += g_loss;
            let event = GanStep {
                epoch,
                step,
                discriminator_loss: d_loss,
                generator_loss: g_loss,
            };
            for cb in callbacks.iter_mut() {
                cb.on_gan_step(&event);
            }
        }
        Ok((d_sum / steps as f64, g_sum / steps as f64))
    }
}

/// Slope used by the hidden leaky ReLUs of both networks.
pub const LEAKY_SLOPE: f64 = 0.2;

fn leaky() -> Option<Box<dyn Activation>> {
    Some(Box::new(LeakyRelu::new(LEAKY_SLOPE)))
}

/// Generator `noise_dim -> 256 -> 512 -> 1024 -> output_dim`, leaky ReLU
/// hidden layers and a tanh output matching data scaled to `[-1, 1]`.
pub fn build_generator<O: Optimiser + 'static>(
    noise_dim: usize,
    output_dim: usize,
    optimiser: O,
    rng: &mut dyn RandomSource,
) -> Result<Model> {
    let mut g = Model::new(optimiser, BinaryCrossEntropy::new());
    g.add(DenseLayer::with_name(noise_dim, 256, leaky(), "gen_1", rng)?);
    g.add(DenseLayer::with_name(256, 512, leaky(), "gen_2", rng)?);
    g.add(DenseLayer::with_name(512, 1024, leaky(), "gen_3", rng)?);
    let tanh: Box<dyn Activation> = Box::new(Tanh::new());
    g.add(DenseLayer::with_name(1024, output_dim, Some(tanh), "gen_out", rng)?);
    Ok(g)
}

/// Discriminator `input_dim -> 512 -> 256 -> 1` ending in a sigmoid.
pub fn build_discriminator<O: Optimiser + 'static>(
    input_dim: usize,
    optimiser: O,
    rng: &mut dyn RandomSource,
) -> Result<Model> {
    let mut d = Model::new(optimiser, BinaryCrossEntropy::new());
    d.add(DenseLayer::with_name(input_dim, 512, leaky(), "disc_1", rng)?);
    d.add(DenseLayer::with_name(512, 256, leaky(), "disc_2", rng)?);
    let sigmoid: Box<dyn Activation> = Box::new(Sigmoid::new());
    d.add(DenseLayer::with_name(256, 1, Some(sigmoid), "disc_out", rng)?);
    Ok(d)
}
