//! Delay-distributed compartments
//!
//! A `DelayCompartment` holds individuals whose sojourn time follows an arbitrary discretized
//! distribution, a `DelaySchedule`. When individuals enter, they are immediately distributed over
//! the future time steps at which they will leave, so that maturing the compartment is a single
//! pop from the front of a ring buffer.
//!

use derive_more::Deref;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::random::{Randomizer, Sampler};
use crate::errors::{Result, config_error};

/// Tolerance for the total weight of a delay schedule.
const NORMALIZATION_TOLERANCE: f64 = 1e-6;

/// Discretized sojourn-time distribution.
///
/// Entry `k` is the probability that an individual leaves the compartment `k` steps after it
/// entered. An individual added with weight in bin 0 leaves again when the compartment is matured
/// in the same step.
#[derive(Clone, Debug, Deref, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct DelaySchedule(Vec<f64>);

impl DelaySchedule {
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if weights.is_empty() {
            return Err(config_error!("delay schedule must not be empty"));
        }
        if let Some(weight) = weights.iter().find(|w| !w.is_finite() || **w < 0.) {
            return Err(config_error!(
                "delay schedule contains invalid weight {weight}"
            ));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.).abs() > NORMALIZATION_TOLERANCE {
            return Err(config_error!(
                "delay schedule weights sum to {total}, expected 1"
            ));
        }
        Ok(Self(weights))
    }

    /// Schedule where everyone leaves exactly `steps` steps after entering.
    pub fn fixed(steps: usize) -> Self {
        let mut weights = vec![0.; steps + 1];
        weights[steps] = 1.;
        Self(weights)
    }

    /// Mean sojourn time in steps.
    pub fn mean(&self) -> f64 {
        self.iter().enumerate().map(|(k, w)| k as f64 * w).sum()
    }
}

impl TryFrom<Vec<f64>> for DelaySchedule {
    type Error = crate::errors::SimulationError;

    fn try_from(weights: Vec<f64>) -> Result<Self> {
        Self::new(weights)
    }
}

impl From<DelaySchedule> for Vec<f64> {
    fn from(schedule: DelaySchedule) -> Self {
        schedule.0
    }
}

/// A compartment whose occupants leave according to the schedule they entered with.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DelayCompartment {
    pending: VecDeque<f64>,
}

impl DelayCompartment {
    pub fn new() -> Self {
        Self {
            pending: VecDeque::new(),
        }
    }

    /// Add `count` individuals that will leave according to `schedule`.
    pub fn add<R: Randomizer + ?Sized>(
        &mut self,
        sampler: &mut Sampler<R>,
        count: f64,
        schedule: &DelaySchedule,
    ) {
        if count <= 0. {
            return;
        }

        if schedule.len() > self.pending.len() {
            self.pending.resize(schedule.len(), 0.);
        }

        let split = sampler.multinomial(count, schedule);
        for (bin, amount) in self.pending.iter_mut().zip(split) {
            *bin += amount;
        }
    }

    /// Advance by one step and return the number of individuals leaving.
    pub fn mature(&mut self) -> f64 {
        self.pending.pop_front().unwrap_or(0.)
    }

    /// Current number of occupants.
    pub fn size(&self) -> f64 {
        self.pending.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.iter().all(|&count| count == 0.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn schedule() -> DelaySchedule {
        DelaySchedule::new(vec![0., 0.1, 0.4, 0.3, 0.2]).unwrap()
    }

    #[test]
    fn reject_malformed_schedules() {
        assert!(DelaySchedule::new(vec![]).is_err());
        assert!(DelaySchedule::new(vec![0.5, 0.4]).is_err());
        assert!(DelaySchedule::new(vec![1.5, -0.5]).is_err());
        assert!(DelaySchedule::new(vec![f64::NAN, 1.]).is_err());
        assert!(DelaySchedule::new(vec![0.25, 0.75]).is_ok());
    }

    #[test]
    fn deserialize_schedule() {
        let schedule: DelaySchedule = serde_yaml::from_str("[0.5, 0.5]").unwrap();
        assert_eq!(*schedule, vec![0.5, 0.5]);
        assert!(serde_yaml::from_str::<DelaySchedule>("[0.5, 0.6]").is_err());
    }

    #[test]
    fn fixed_schedule() {
        let schedule = DelaySchedule::fixed(3);
        assert_eq!(*schedule, vec![0., 0., 0., 1.]);
        assert_eq!(schedule.mean(), 3.);
    }

    #[test]
    fn deterministic_pulse_matures_completely() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sampler = Sampler::new(&mut rng, true);
        let mut compartment = DelayCompartment::new();

        compartment.add(&mut sampler, 100., &schedule());
        assert!((compartment.size() - 100.).abs() < 1e-9);

        let matured: Vec<f64> = (0..8).map(|_| compartment.mature()).collect();
        assert_eq!(matured[0], 0.);
        assert!((matured[1] - 10.).abs() < 1e-9);
        assert!((matured[2] - 40.).abs() < 1e-9);
        assert!((matured.iter().sum::<f64>() - 100.).abs() < 1e-9);
        assert_eq!(compartment.size(), 0.);
        assert!(compartment.is_empty());
    }

    #[test]
    fn stochastic_pulse_matures_completely() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut sampler = Sampler::new(&mut rng, false);
        let mut compartment = DelayCompartment::new();

        compartment.add(&mut sampler, 1000., &schedule());
        assert_eq!(compartment.size(), 1000.);

        let mut total = 0.;
        for _ in 0..10 {
            let matured = compartment.mature();
            assert_eq!(matured, matured.round());
            total += matured;
        }
        assert_eq!(total, 1000.);
    }

    #[test]
    fn overlapping_cohorts() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sampler = Sampler::new(&mut rng, true);
        let mut compartment = DelayCompartment::new();
        let schedule = DelaySchedule::fixed(2);

        compartment.add(&mut sampler, 5., &schedule);
        assert_eq!(compartment.mature(), 0.);
        compartment.add(&mut sampler, 7., &schedule);
        assert_eq!(compartment.size(), 12.);
        assert_eq!(compartment.mature(), 0.);
        assert_eq!(compartment.mature(), 5.);
        assert_eq!(compartment.mature(), 7.);
        assert_eq!(compartment.mature(), 0.);
    }

    #[test]
    fn adding_nothing_is_a_no_op() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut sampler = Sampler::new(&mut rng, false);
        let mut compartment = DelayCompartment::new();
        compartment.add(&mut sampler, 0., &schedule());
        assert_eq!(compartment, DelayCompartment::new());
        assert_eq!(compartment.mature(), 0.);
    }
}
