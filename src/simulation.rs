//! Fixed-step driver
//!
//! A `Simulation` owns the subpopulations, one random stream per subpopulation and the result
//! grid. Every step first lets the metapopulation compute the force of infection for all
//! subpopulations and then advances each of them. With the `parallel` feature, subpopulations
//! advance concurrently; each one only touches its own stream and its own part of the grid.
//!

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::Parameters;
use crate::core::{Metapopulation, Observer, ProcessTable, Randomizer, Results, Step, Subpopulation};
use crate::errors::{Result, config_error};

/// Result grid of a finished run.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationOutput {
    pub results: Results,
    /// `false` if an observer stopped the run early.
    pub completed: bool,
}

/// Streams need to be `Send` so that subpopulations can advance on worker threads.
pub struct Simulation<'a, R: Randomizer + Send> {
    parameters: &'a Parameters,
    processes: ProcessTable,
    populations: Vec<Subpopulation>,
    metapopulation: Metapopulation,
    streams: Vec<R>,
    results: Results,
    step: usize,
    n_steps: usize,
}

impl<'a, R: Randomizer + Send> Simulation<'a, R> {
    pub fn new(parameters: &'a Parameters, streams: Vec<R>) -> Result<Self> {
        parameters.validate()?;
        if streams.len() != parameters.n_populations() {
            return Err(config_error!(
                "{} random streams for {} populations",
                streams.len(),
                parameters.n_populations()
            ));
        }

        let processes = ProcessTable::new(&parameters.processes)?;
        let results = Results::new(parameters, processes.columns().to_vec())?;
        let populations = parameters
            .populations
            .iter()
            .enumerate()
            .map(|(index, population)| Subpopulation::new(index, population, &processes))
            .collect();
        let n_steps = parameters
            .n_steps()
            .min(results.rows() * parameters.report_every);

        Ok(Self {
            parameters,
            processes,
            populations,
            metapopulation: Metapopulation::new(),
            streams,
            results,
            step: 0,
            n_steps,
        })
    }

    pub fn populations(&self) -> &[Subpopulation] {
        &self.populations
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    pub fn is_finished(&self) -> bool {
        self.step >= self.n_steps
    }

    /// Execute the next step and return whether all observers want to continue.
    pub fn step<O: Observer + ?Sized>(&mut self, observer: &O) -> Result<bool> {
        if self.is_finished() {
            return Ok(false);
        }
        let step = Step::new(self.parameters, self.step);
        log::debug!("Step {} at t={}...", step.index, step.time);

        let keep_going = self.advance(&step, observer)?;
        self.step += 1;
        Ok(keep_going)
    }

    #[cfg(not(feature = "parallel"))]
    fn advance<O: Observer + ?Sized>(&mut self, step: &Step, observer: &O) -> Result<bool> {
        let force = self.metapopulation.force_of_infection(
            self.parameters,
            &mut self.populations,
            &mut self.streams,
            step.time,
        )?;
        let mut views = self.results.population_views();

        // every population advances, even after one of them asked to stop
        let mut keep_going = true;
        for (((population, stream), view), force) in self
            .populations
            .iter_mut()
            .zip(self.streams.iter_mut())
            .zip(views.iter_mut())
            .zip(force)
        {
            keep_going &= population.advance(
                self.parameters,
                &self.processes,
                stream,
                step,
                force,
                view,
                observer,
            );
        }
        Ok(keep_going)
    }

    #[cfg(feature = "parallel")]
    fn advance<O: Observer + ?Sized>(&mut self, step: &Step, observer: &O) -> Result<bool> {
        let force = self.metapopulation.force_of_infection(
            self.parameters,
            &mut self.populations,
            &mut self.streams,
            step.time,
        )?;
        let views = self.results.population_views();
        let parameters = self.parameters;
        let processes = &self.processes;

        // collect before combining, `all` on a parallel iterator may skip populations
        let verdicts: Vec<bool> = self
            .populations
            .par_iter_mut()
            .zip(self.streams.par_iter_mut())
            .zip(views.into_par_iter())
            .zip(force.par_iter())
            .map(|(((population, stream), mut view), force)| {
                population.advance(
                    parameters, processes, stream, step, force, &mut view, observer,
                )
            })
            .collect();
        Ok(verdicts.into_iter().all(|keep_going| keep_going))
    }

    /// Run all remaining steps, or until an observer asks to stop.
    pub fn run<O: Observer + ?Sized>(mut self, observer: &O) -> Result<SimulationOutput> {
        log::info!(
            "Simulating {} populations from t={} to t={} in {} steps.",
            self.populations.len(),
            self.parameters.time0,
            self.parameters.time1,
            self.n_steps
        );

        while !self.is_finished() {
            if !self.step(observer)? {
                log::warn!(
                    "Simulation stopped by observer after step {} of {}.",
                    self.step,
                    self.n_steps
                );
                return Ok(SimulationOutput {
                    results: self.results,
                    completed: false,
                });
            }
        }

        log::info!("Finished simulation.");
        Ok(SimulationOutput {
            results: self.results,
            completed: true,
        })
    }
}

/// Set up a simulation and run it to the end.
pub fn run_simulation<R: Randomizer + Send, O: Observer + ?Sized>(
    parameters: &Parameters,
    streams: Vec<R>,
    observer: &O,
) -> Result<SimulationOutput> {
    Simulation::new(parameters, streams)?.run(observer)
}
