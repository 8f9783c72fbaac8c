//! Random sources
//!
//! The simulation never talks to a concrete generator. It draws through the `Randomizer` trait,
//! which is implemented for every `rand::Rng`, and through a `Sampler`, which decides whether a
//! draw is an actual random variate or its expectation.
//!

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Binomial, Distribution};

/// Source of binomial and multinomial variates.
pub trait Randomizer {
    /// Draw from Binomial(`n`, `p`).
    fn binomial(&mut self, n: u64, p: f64) -> u64;

    /// Draw from Multinomial(`n`, `probabilities`) into `out`.
    ///
    /// Probabilities need not be normalized; the draw uses sequential conditional binomials.
    fn multinomial(&mut self, n: u64, probabilities: &[f64], out: &mut [u64]) {
        out.fill(0);
        // the remainder goes to the last category that can receive anyone
        let Some(last) = probabilities.iter().rposition(|&p| p > 0.) else {
            return;
        };
        let mut remaining = n;
        let mut mass: f64 = probabilities.iter().filter(|&&p| p > 0.).sum();

        for (i, (&p, slot)) in probabilities.iter().zip(out.iter_mut()).enumerate() {
            if remaining == 0 {
                break;
            }
            if i == last {
                *slot = remaining;
                break;
            }
            if p <= 0. {
                continue;
            }
            let draw = self.binomial(remaining, p / mass);
            *slot = draw;
            remaining -= draw;
            mass -= p;
        }
    }
}

impl<R: rand::Rng + ?Sized> Randomizer for R {
    fn binomial(&mut self, n: u64, p: f64) -> u64 {
        if n == 0 || p <= 0. {
            return 0;
        }
        if p >= 1. {
            return n;
        }
        match Binomial::new(n, p) {
            Ok(distribution) => distribution.sample(self),
            Err(_) => 0,
        }
    }
}

/// Create one independently seeded stream per subpopulation.
pub fn seeded_streams(seed: u64, n_streams: usize) -> Vec<StdRng> {
    (0..n_streams)
        .map(|stream| StdRng::seed_from_u64(seed.wrapping_add(stream as u64)))
        .collect()
}

/// Draw policy shared by all transitions of a step.
///
/// In deterministic mode every draw returns its expectation, in stochastic mode counts are
/// rounded to integers and sampled.
pub struct Sampler<'a, R: Randomizer + ?Sized> {
    rng: &'a mut R,
    deterministic: bool,
    counts: Vec<u64>,
    split: Vec<f64>,
}

impl<'a, R: Randomizer + ?Sized> Sampler<'a, R> {
    pub fn new(rng: &'a mut R, deterministic: bool) -> Self {
        Self {
            rng,
            deterministic,
            counts: Vec::new(),
            split: Vec::new(),
        }
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    /// Number of successes out of `n` trials with probability `p`.
    pub fn binomial(&mut self, n: f64, p: f64) -> f64 {
        if self.deterministic {
            n * p
        } else {
            self.rng.binomial(to_count(n), p) as f64
        }
    }

    /// Split `n` over categories with the given probabilities.
    ///
    /// The returned slice lives in the sampler and is overwritten on the next call.
    pub fn multinomial(&mut self, n: f64, probabilities: &[f64]) -> &[f64] {
        self.split.clear();
        if self.deterministic {
            self.split.extend(probabilities.iter().map(|p| n * p));
        } else {
            self.counts.resize(probabilities.len(), 0);
            self.rng
                .multinomial(to_count(n), probabilities, &mut self.counts);
            self.split.extend(self.counts.iter().map(|&c| c as f64));
        }
        &self.split
    }
}

/// Whole individuals available for a draw; partial individuals never take part.
fn to_count(n: f64) -> u64 {
    if n > 0. { n.floor() as u64 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binomial_edge_cases() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(rng.binomial(0, 0.5), 0);
        assert_eq!(rng.binomial(10, 0.), 0);
        assert_eq!(rng.binomial(10, 1.), 10);
        assert!(rng.binomial(10, 0.5) <= 10);
    }

    #[test]
    fn multinomial_conserves_total() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut out = [0u64; 4];
        for n in [0, 1, 13, 1000] {
            rng.multinomial(n, &[0.1, 0.2, 0.3, 0.4], &mut out);
            assert_eq!(out.iter().sum::<u64>(), n);
        }
    }

    #[test]
    fn multinomial_respects_zero_categories() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut out = [0u64; 3];
        rng.multinomial(500, &[0., 1., 0.], &mut out);
        assert_eq!(out, [0, 500, 0]);
    }

    #[test]
    fn deterministic_sampler_returns_expectations() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sampler = Sampler::new(&mut rng, true);
        assert!(sampler.is_deterministic());
        assert_eq!(sampler.binomial(10., 0.25), 2.5);
        assert_eq!(sampler.multinomial(4., &[0.5, 0.25, 0.25]), &[2., 1., 1.]);
    }

    #[test]
    fn stochastic_sampler_returns_counts() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sampler = Sampler::new(&mut rng, false);
        let draw = sampler.binomial(100., 0.3);
        assert_eq!(draw, draw.round());
        let split = sampler.multinomial(50., &[0.2, 0.8]).to_vec();
        assert_eq!(split.iter().sum::<f64>(), 50.);
    }

    #[test]
    fn stochastic_draws_never_exceed_whole_individuals() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut sampler = Sampler::new(&mut rng, false);
        for _ in 0..200 {
            assert!(sampler.binomial(10.6, 1.) <= 10.);
            assert!(sampler.binomial(0.9, 1.) == 0.);
        }
        assert_eq!(sampler.multinomial(7.8, &[0.5, 0.5]).iter().sum::<f64>(), 7.);
    }

    #[test]
    fn streams_are_reproducible() {
        let mut first = seeded_streams(3, 2);
        let mut second = seeded_streams(3, 2);
        assert_eq!(first[1].binomial(1000, 0.5), second[1].binomial(1000, 0.5));
    }
}
