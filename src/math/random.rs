use std::f64::consts::PI;
use std::sync::OnceLock;

use parking_lot::Mutex;
use rand::prelude::*;
use rand::rngs::StdRng;

static GLOBAL: OnceLock<Mutex<NormalSampler>> = OnceLock::new();

/// Standard normal generator built on the Box-Muller transform.
///
/// Each transform yields two independent values; the second one is kept and
/// handed out by the next call.
#[derive(Debug, Clone)]
pub struct NormalSampler {
    rng: StdRng,
    spare: Option<f64>,
}

impl NormalSampler {
    /// A sampler seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            spare: None,
        }
    }

    /// A reproducible sampler.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            spare: None,
        }
    }

    /// Draws one value from N(0, 1).
    pub fn sample(&mut self) -> f32 {
        if let Some(z1) = self.spare.take() {
            return z1 as f32;
        }

        // u1 must stay away from zero so that ln(u1) is finite.
        let mut u1: f64 = self.rng.gen();
        while u1 <= f64::MIN_POSITIVE {
            u1 = self.rng.gen();
        }
        let u2: f64 = self.rng.gen();

        let radius = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * PI * u2;

        self.spare = Some(radius * theta.sin());
        (radius * theta.cos()) as f32
    }

    pub fn fill(&mut self, out: &mut [f32]) {
        for x in out.iter_mut() {
            *x = self.sample();
        }
    }
}

impl Default for NormalSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide sampler, shared behind a lock.
pub fn global() -> &'static Mutex<NormalSampler> {
    GLOBAL.get_or_init(|| Mutex::new(NormalSampler::new()))
}

/// Reseeds the process-wide sampler.
pub fn seed_global(seed: u64) {
    *global().lock() = NormalSampler::seeded(seed);
}

/// One N(0, 1) draw from the process-wide sampler.
pub fn randn() -> f32 {
    global().lock().sample()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_samplers_are_reproducible() {
        let mut a = NormalSampler::seeded(7);
        let mut b = NormalSampler::seeded(7);
        for _ in 0..16 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn samples_look_standard_normal() {
        let mut sampler = NormalSampler::seeded(42);
        let n = 20_000;
        let draws: Vec<f32> = (0..n).map(|_| sampler.sample()).collect();

        let mean = draws.iter().sum::<f32>() / n as f32;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / n as f32;

        assert!(mean.abs() < 0.05, "mean = {mean}");
        assert!((var - 1.0).abs() < 0.05, "var = {var}");
        assert!(draws.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn global_sampler_is_usable() {
        assert!(randn().is_finite());
    }
}
