//! Subpopulation module
//!
//! A `Subpopulation` is one age-structured population with the built-in progression
//!
//! ```text
//! S -> E -> Ip -> Is -> H -> R
//!        \-> Ia -----------> R
//! ```
//!
//! plus a reporting-only chain C fed by a fraction of symptom onsets, and the compartments of all
//! user-defined processes. Counts are expectations in deterministic runs and integers otherwise.
//!

use itertools::izip;

use super::compartment::DelayCompartment;
use super::observer::Observer;
use super::process::{ProcessTable, Source};
use super::random::{Randomizer, Sampler};
use super::results::{Column, ReportView};
use crate::config::{BuiltinEvent, Parameters, PopulationParameters};
use crate::errors::{Result, SimulationError};

/// Position of the simulation clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub index: usize,
    pub time: f64,
    /// Row of the result grid this step reports into.
    pub row: usize,
    /// Whether prevalence is recorded in this step.
    pub snapshot: bool,
}

impl Step {
    pub fn new(parameters: &Parameters, index: usize) -> Self {
        Self {
            index,
            time: parameters.time0 + index as f64 * parameters.time_step,
            row: index / parameters.report_every,
            snapshot: index % parameters.report_every == 0,
        }
    }
}

/// Counts of the built-in transitions of one age group in one step.
#[derive(Clone, Copy, Debug, Default)]
struct Transitions {
    infected: f64,
    incubated: f64,
    presymptomatic: f64,
    asymptomatic: f64,
    onsets: f64,
    hospitalized: f64,
    discharged: f64,
    asymptomatic_recovered: f64,
}

impl Transitions {
    fn count(&self, event: BuiltinEvent) -> f64 {
        match event {
            BuiltinEvent::Infection => self.infected,
            BuiltinEvent::Incubation => self.incubated,
            BuiltinEvent::PresymptomaticOnset => self.presymptomatic,
            BuiltinEvent::AsymptomaticOnset => self.asymptomatic,
            BuiltinEvent::SymptomOnset => self.onsets,
            BuiltinEvent::Hospitalization => self.hospitalized,
            BuiltinEvent::Discharge => self.discharged,
            BuiltinEvent::AsymptomaticRecovery => self.asymptomatic_recovered,
            BuiltinEvent::Recovery => self.discharged + self.asymptomatic_recovered,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Subpopulation {
    index: usize,
    parameters: PopulationParameters,
    version: usize,
    susceptible: Vec<f64>,
    exposed: Vec<DelayCompartment>,
    presymptomatic: Vec<DelayCompartment>,
    asymptomatic: Vec<DelayCompartment>,
    symptomatic: Vec<DelayCompartment>,
    hospitalized: Vec<DelayCompartment>,
    reporting: Vec<DelayCompartment>,
    recovered: Vec<f64>,
    /// Process compartments, indexed by compartment id, then age group.
    processes: Vec<Vec<DelayCompartment>>,
    seed_cursor: usize,
    schedule_cursor: usize,
    incoming: Vec<f64>,
    outgoing: Vec<f64>,
    split: Vec<f64>,
}

impl Subpopulation {
    /// Construct a fully susceptible population.
    pub fn new(index: usize, parameters: &PopulationParameters, processes: &ProcessTable) -> Self {
        let mut parameters = parameters.clone();
        parameters.recalculate();

        let n_ages = parameters.n_age_groups();
        let compartments = || vec![DelayCompartment::new(); n_ages];
        log::debug!(
            "Population {index}: mean latent period {} steps, mean symptomatic period {} steps.",
            parameters.delays.exposed.mean(),
            parameters.delays.symptomatic.mean()
        );

        Self {
            index,
            susceptible: parameters.size.clone(),
            exposed: compartments(),
            presymptomatic: compartments(),
            asymptomatic: compartments(),
            symptomatic: compartments(),
            hospitalized: compartments(),
            reporting: compartments(),
            recovered: vec![0.; n_ages],
            processes: vec![compartments(); processes.n_compartments()],
            seed_cursor: 0,
            schedule_cursor: 0,
            incoming: vec![0.; processes.n_compartments()],
            outgoing: vec![0.; processes.n_compartments()],
            split: Vec::new(),
            parameters,
            version: 0,
        }
    }

    /// Seed due infections, apply due parameter changes and write the effective number of
    /// infectious individuals per capita of each age group into `contagiousness`.
    pub fn compute_contagiousness<R: Randomizer + ?Sized>(
        &mut self,
        deterministic: bool,
        rng: &mut R,
        time: f64,
        contagiousness: &mut [f64],
    ) -> Result<()> {
        let mut sampler = Sampler::new(rng, deterministic);

        while let Some(seed) = self.parameters.seeds.get(self.seed_cursor) {
            if time < seed.time {
                break;
            }
            let amounts = sampler.multinomial(seed.count, &seed.weights).to_vec();
            for (age, amount) in amounts.into_iter().enumerate() {
                self.seed(&mut sampler, age, amount, time)?;
            }
            self.seed_cursor += 1;
        }

        let mut changed = false;
        while let Some(entry) = self.parameters.schedule.get(self.schedule_cursor) {
            if time < entry.time {
                break;
            }
            log::info!(
                "Population {} changes {} at t={time}.",
                self.index,
                entry.change.name()
            );
            let changed_parameters = self.parameters.with_change(&entry.change);
            self.parameters = changed_parameters;
            self.version += 1;
            self.schedule_cursor += 1;
            changed = true;
        }
        if changed {
            self.parameters.recalculate();
        }

        let parameters = &self.parameters;
        for (contagious, size, f_ip, f_ia, f_is, ip, ia, is) in izip!(
            contagiousness.iter_mut(),
            &parameters.size,
            &parameters.infectiousness_presymptomatic,
            &parameters.infectiousness_asymptomatic,
            &parameters.infectiousness_symptomatic,
            &self.presymptomatic,
            &self.asymptomatic,
            &self.symptomatic,
        ) {
            *contagious = if *size == 0. {
                0.
            } else {
                (f_ip * ip.size() + f_ia * ia.size() + f_is * is.size()) / size
            };
        }

        Ok(())
    }

    fn seed<R: Randomizer + ?Sized>(
        &mut self,
        sampler: &mut Sampler<R>,
        age: usize,
        amount: f64,
        time: f64,
    ) -> Result<()> {
        if amount <= 0. {
            return Ok(());
        }
        if self.susceptible[age] < amount {
            return Err(SimulationError::InsufficientSusceptibles {
                population: self.index,
                age,
                time,
                requested: amount,
                available: self.susceptible[age],
            });
        }
        self.susceptible[age] -= amount;
        self.exposed[age].add(sampler, amount, &self.parameters.delays.exposed);
        Ok(())
    }

    /// Execute one step of transitions given the incoming force of infection per age group.
    ///
    /// Returns the observer's verdict on whether the simulation should continue.
    #[allow(clippy::too_many_arguments)]
    pub fn advance<R: Randomizer + ?Sized, O: Observer + ?Sized>(
        &mut self,
        parameters: &Parameters,
        processes: &ProcessTable,
        rng: &mut R,
        step: &Step,
        force: &[f64],
        report: &mut ReportView,
        observer: &O,
    ) -> bool {
        let mut sampler = Sampler::new(rng, parameters.deterministic);
        let delays = &self.parameters.delays;
        let row = step.row;

        for (a, &lambda) in force.iter().enumerate() {
            if step.snapshot {
                report.set(row, a, Column::Susceptible.index(), self.susceptible[a]);
                report.set(row, a, Column::Exposed.index(), self.exposed[a].size());
                report.set(row, a, Column::Presymptomatic.index(), self.presymptomatic[a].size());
                report.set(row, a, Column::Symptomatic.index(), self.symptomatic[a].size());
                report.set(row, a, Column::Asymptomatic.index(), self.asymptomatic[a].size());
                report.set(row, a, Column::Recovered.index(), self.recovered[a]);
                for prevalence in processes.prevalence_columns() {
                    let size = self.processes[prevalence.compartment][a].size();
                    report.set(row, a, prevalence.column, size);
                }
            }

            let mut t = Transitions::default();

            // S -> E
            let p_infection = 1. - (-lambda * parameters.time_step).exp();
            t.infected = sampler.binomial(self.susceptible[a], p_infection);
            self.susceptible[a] -= t.infected;
            self.exposed[a].add(&mut sampler, t.infected, &delays.exposed);

            // E -> Ip / Ia
            t.incubated = self.exposed[a].mature();
            t.presymptomatic =
                sampler.binomial(t.incubated, self.parameters.symptomatic_fraction[a]);
            t.asymptomatic = t.incubated - t.presymptomatic;
            self.presymptomatic[a].add(&mut sampler, t.presymptomatic, &delays.presymptomatic);
            self.asymptomatic[a].add(&mut sampler, t.asymptomatic, &delays.asymptomatic);

            // Ip -> Is
            t.onsets = self.presymptomatic[a].mature();
            self.symptomatic[a].add(&mut sampler, t.onsets, &delays.symptomatic);

            // reported cases
            let to_report = sampler.binomial(t.onsets, self.parameters.reporting_fraction[a]);
            self.reporting[a].add(&mut sampler, to_report, &delays.reporting);
            let reported = self.reporting[a].mature();

            // Is -> H -> R
            t.hospitalized = self.symptomatic[a].mature();
            self.hospitalized[a].add(&mut sampler, t.hospitalized, &delays.hospitalized);
            t.discharged = self.hospitalized[a].mature();
            self.recovered[a] += t.discharged;

            // Ia -> R
            t.asymptomatic_recovered = self.asymptomatic[a].mature();
            self.recovered[a] += t.asymptomatic_recovered;

            // processes see outflows of this step, not what earlier processes added
            for (outgoing, compartments) in self.outgoing.iter_mut().zip(&mut self.processes) {
                *outgoing = compartments[a].mature();
            }

            for process in processes.processes() {
                let entering = match process.source {
                    Source::Builtin(event) => t.count(event),
                    Source::Outflow(id) => self.outgoing[id],
                };

                self.split.clear();
                self.split
                    .extend_from_slice(sampler.multinomial(entering, &process.probabilities[a]));

                for ((id, delay), &amount) in process
                    .compartments
                    .clone()
                    .zip(&process.delays)
                    .zip(&self.split)
                {
                    self.processes[id][a].add(&mut sampler, amount, delay);
                    self.incoming[id] = amount;
                }
            }

            report.add(row, a, Column::Cases.index(), t.onsets);
            report.add(row, a, Column::CasesReported.index(), reported);
            report.add(row, a, Column::Subclinical.index(), t.asymptomatic);
            for incidence in processes.incidence_columns() {
                report.add(row, a, incidence.column, self.incoming[incidence.compartment]);
            }
            for outflow in processes.outflow_columns() {
                report.add(row, a, outflow.column, self.outgoing[outflow.compartment]);
            }
        }

        observer.observe(self, step.time)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Current snapshot of this population's parameters.
    pub fn parameters(&self) -> &PopulationParameters {
        &self.parameters
    }

    /// Number of scheduled changes applied so far.
    pub fn parameters_version(&self) -> usize {
        self.version
    }

    pub fn n_age_groups(&self) -> usize {
        self.susceptible.len()
    }

    pub fn susceptible(&self, age: usize) -> f64 {
        self.susceptible[age]
    }

    pub fn exposed(&self, age: usize) -> f64 {
        self.exposed[age].size()
    }

    pub fn presymptomatic(&self, age: usize) -> f64 {
        self.presymptomatic[age].size()
    }

    pub fn asymptomatic(&self, age: usize) -> f64 {
        self.asymptomatic[age].size()
    }

    pub fn symptomatic(&self, age: usize) -> f64 {
        self.symptomatic[age].size()
    }

    pub fn hospitalized(&self, age: usize) -> f64 {
        self.hospitalized[age].size()
    }

    pub fn recovered(&self, age: usize) -> f64 {
        self.recovered[age]
    }

    /// Onsets waiting to be reported.
    pub fn awaiting_report(&self, age: usize) -> f64 {
        self.reporting[age].size()
    }

    pub fn process_prevalence(&self, compartment: usize, age: usize) -> f64 {
        self.processes[compartment][age].size()
    }

    /// Everyone in the built-in progression; the reporting chain and processes only mirror it.
    pub fn total(&self, age: usize) -> f64 {
        self.susceptible(age)
            + self.exposed(age)
            + self.presymptomatic(age)
            + self.asymptomatic(age)
            + self.symptomatic(age)
            + self.hospitalized(age)
            + self.recovered(age)
    }

    /// Everyone infected but not yet recovered.
    pub fn infected(&self) -> f64 {
        (0..self.n_age_groups())
            .map(|a| {
                self.exposed(a)
                    + self.presymptomatic(a)
                    + self.asymptomatic(a)
                    + self.symptomatic(a)
                    + self.hospitalized(a)
            })
            .sum()
    }

    /// Number of seeding events that have not happened yet.
    pub fn pending_seeds(&self) -> usize {
        self.parameters.seeds.len() - self.seed_cursor
    }
}
