use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Source of randomness consumed by the matrix generators, weight
/// initialisation and row shuffling.
pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    /// Uniform integer in `[min, max)`.
    fn uniform_int(&mut self, min: usize, max: usize) -> usize;

    /// Uniform sample in `[min, max)`. Returns `min` when the range is
    /// empty.
    fn uniform_range(&mut self, min: f64, max: f64) -> f64 {
        interpolate_below(self, min, max)
    }

    /// Standard normal sample using the Box-Muller transform over two
    /// independent uniform draws.
    fn standard_normal(&mut self) -> f64 {
        // 1 - u keeps the argument of ln inside (0, 1].
        let u1 = 1.0 - self.uniform();
        let u2 = self.uniform();
        let r = (-2.0 * u1.ln()).sqrt();
        r * (2.0 * PI * u2).sin()
    }

    /// Normal sample with the given mean and standard deviation.
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        mean + std_dev * self.standard_normal()
    }
}

/// Weighted endpoints keep wide ranges finite; draws that round onto `max`
/// or below `min` are redrawn. A zero draw always yields `min`.
fn interpolate_below<R: RandomSource + ?Sized>(source: &mut R, min: f64, max: f64) -> f64 {
    if !(min < max) {
        return min;
    }
    loop {
        let u = source.uniform();
        let v = min * (1.0 - u) + max * u;
        if v >= min && v < max {
            return v;
        }
    }
}

/// [`RandomSource`] backed by [`StdRng`].
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn uniform_int(&mut self, min: usize, max: usize) -> usize {
        if min >= max {
            return min;
        }
        self.rng.gen_range(min..max)
    }

    fn uniform_range(&mut self, min: f64, max: f64) -> f64 {
        if min < max && (max - min).is_finite() {
            self.rng.gen_range(min..max)
        } else {
            interpolate_below(self, min, max)
        }
    }
}

/// Create a [`StdRandom`] seeded from the `SEED` environment variable.
///
/// Each call uses a unique seed derived from the base seed and an
/// incrementing counter so that separate streams stay deterministic yet
/// distinct. Without `SEED` the generator is seeded from OS entropy.
pub fn rng_from_env() -> StdRandom {
    match std::env::var("SEED").ok().and_then(|s| s.parse::<u64>().ok()) {
        Some(base) => {
            let idx = COUNTER.fetch_add(1, Ordering::SeqCst);
            StdRandom::seeded(base.wrapping_add(idx))
        }
        None => StdRandom::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_streams_are_reproducible() {
        let mut a = StdRandom::seeded(7);
        let mut b = StdRandom::seeded(7);
        for _ in 0..16 {
            assert_eq!(a.uniform(), b.uniform());
        }
    }

    #[test]
    fn uniform_int_stays_in_half_open_range() {
        let mut rng = StdRandom::seeded(1);
        for _ in 0..1000 {
            let v = rng.uniform_int(3, 6);
            assert!((3..6).contains(&v));
        }
    }

    /// Replays a fixed list of uniform draws.
    struct Scripted(Vec<f64>);

    impl RandomSource for Scripted {
        fn uniform(&mut self) -> f64 {
            self.0.remove(0)
        }

        fn uniform_int(&mut self, min: usize, _max: usize) -> usize {
            min
        }
    }

    #[test]
    fn default_uniform_range_redraws_at_max() {
        let max = 1.0 + f64::EPSILON;
        let mut src = Scripted(vec![1.0 - f64::EPSILON / 2.0, 0.0]);
        assert_eq!(src.uniform_range(1.0, max), 1.0);
        assert!(src.0.is_empty());

        let mut src = Scripted(vec![0.75]);
        let v = src.uniform_range(-1e308, 1e308);
        assert!(v.is_finite() && (v - 5e307).abs() < 1e294);
        assert_eq!(Scripted(vec![]).uniform_range(2.0, 2.0), 2.0);
    }

    #[test]
    fn std_uniform_range_stays_below_max() {
        let mut rng = StdRandom::seeded(1);
        let max = 1.0 + f64::EPSILON;
        for _ in 0..1000 {
            let v = rng.uniform_range(1.0, max);
            assert!((1.0..max).contains(&v));
            let w = rng.uniform_range(-1e308, 1e308);
            assert!(w.is_finite() && w < 1e308);
        }
    }

    #[test]
    fn normal_samples_have_expected_moments() {
        let mut rng = StdRandom::seeded(3);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| rng.normal(2.0, 0.5)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!((mean - 2.0).abs() < 0.02, "mean {mean}");
        assert!((var.sqrt() - 0.5).abs() < 0.02, "std {}", var.sqrt());
    }
}
