//! Per-step callbacks that can stop a simulation early.

use super::population::Subpopulation;

/// Called once per subpopulation after every step.
///
/// Returning `false` asks the simulation to stop after the current step. All subpopulations are
/// still advanced in that step.
pub trait Observer: Sync {
    fn observe(&self, population: &Subpopulation, time: f64) -> bool;
}

impl<F> Observer for F
where
    F: Fn(&Subpopulation, f64) -> bool + Sync,
{
    fn observe(&self, population: &Subpopulation, time: f64) -> bool {
        self(population, time)
    }
}

/// Never stops the simulation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unobserved;

impl Observer for Unobserved {
    fn observe(&self, _population: &Subpopulation, _time: f64) -> bool {
        true
    }
}

/// Stops once a subpopulation has no infected individuals and no seeding left.
#[derive(Clone, Copy, Debug, Default)]
pub struct UntilExtinction;

impl Observer for UntilExtinction {
    fn observe(&self, population: &Subpopulation, time: f64) -> bool {
        let active = population.infected() > 0. || population.pending_seeds() > 0;
        if !active {
            log::debug!(
                "Epidemic extinct in population {} at t={time}.",
                population.index()
            );
        }
        active
    }
}
