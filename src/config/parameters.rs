use serde::{Deserialize, Serialize};
use std::fmt;

use super::SettingsError;
use super::matrix::Matrix;
use super::process::ProcessDefinition;
use super::schedule::{ParameterChange, ScheduleEntry, SeedEvent};
use crate::core::DelaySchedule;
use crate::errors::{Result, config_error};

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Tolerance for `time_step * report_every == 1`.
const REPORTING_TOLERANCE: f64 = 1e-6;

/// Delay schedules of the built-in compartments, in simulation steps.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Delays {
    /// Latent period, E.
    pub exposed: DelaySchedule,
    /// Presymptomatic infectious period, Ip.
    pub presymptomatic: DelaySchedule,
    /// Asymptomatic infectious period, Ia.
    pub asymptomatic: DelaySchedule,
    /// Symptomatic infectious period, Is.
    pub symptomatic: DelaySchedule,
    /// Time in hospital, H.
    pub hospitalized: DelaySchedule,
    /// Time from onset to a case being reported, C.
    pub reporting: DelaySchedule,
}

/// Parameters of a single age-structured subpopulation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PopulationParameters {
    #[serde(default)]
    pub name: String,

    /// Number of individuals in each age group.
    pub size: Vec<f64>,

    /// Component contact matrices, combined with the `contact` multipliers.
    pub matrices: Vec<Matrix>,

    /// Multiplier of each component contact matrix. Defaults to one per matrix.
    #[serde(default)]
    pub contact: Vec<f64>,

    /// Susceptibility to infection upon contact, by age group.
    pub susceptibility: Vec<f64>,

    /// Probability that an infection becomes symptomatic, by age group.
    pub symptomatic_fraction: Vec<f64>,

    /// Relative infectiousness of presymptomatic individuals.
    pub infectiousness_presymptomatic: Vec<f64>,

    /// Relative infectiousness of asymptomatic individuals.
    pub infectiousness_asymptomatic: Vec<f64>,

    /// Relative infectiousness of symptomatic individuals.
    pub infectiousness_symptomatic: Vec<f64>,

    /// Probability that a symptomatic case is reported.
    pub reporting_fraction: Vec<f64>,

    /// Discount of infectiousness exported to other subpopulations.
    pub travel_discount: Vec<f64>,

    pub delays: Delays,

    #[serde(default)]
    pub seeds: Vec<SeedEvent>,

    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,

    /// Effective contact matrix, derived by `recalculate`.
    #[serde(skip)]
    effective_contact: Option<Matrix>,
}

impl PopulationParameters {
    pub fn n_age_groups(&self) -> usize {
        self.size.len()
    }

    /// Effective contact matrix `sum_m contact[m] * matrices[m]`.
    pub fn contact_matrix(&self) -> Matrix {
        match &self.effective_contact {
            Some(matrix) => matrix.clone(),
            None => self.combine_matrices(),
        }
    }

    pub(crate) fn contact_rate(&self, from: usize, to: usize) -> f64 {
        match &self.effective_contact {
            Some(matrix) => matrix.get(from, to),
            None => self.combine_matrices().get(from, to),
        }
    }

    fn combine_matrices(&self) -> Matrix {
        let mut combined = Matrix::zeros(self.n_age_groups());
        for (m, matrix) in self.matrices.iter().enumerate() {
            combined.add_scaled(matrix, self.contact.get(m).copied().unwrap_or(1.));
        }
        combined
    }

    /// Recompute derived parameters after a change.
    pub fn recalculate(&mut self) {
        self.effective_contact = Some(self.combine_matrices());
    }

    /// Return a copy of these parameters with `change` applied.
    pub fn with_change(&self, change: &ParameterChange) -> Self {
        let mut changed = self.clone();
        match change.clone() {
            ParameterChange::Contact(value) => changed.contact = value,
            ParameterChange::Matrices(value) => changed.matrices = value,
            ParameterChange::Susceptibility(value) => changed.susceptibility = value,
            ParameterChange::SymptomaticFraction(value) => changed.symptomatic_fraction = value,
            ParameterChange::ReportingFraction(value) => changed.reporting_fraction = value,
            ParameterChange::InfectiousnessPresymptomatic(value) => {
                changed.infectiousness_presymptomatic = value
            }
            ParameterChange::InfectiousnessAsymptomatic(value) => {
                changed.infectiousness_asymptomatic = value
            }
            ParameterChange::InfectiousnessSymptomatic(value) => {
                changed.infectiousness_symptomatic = value
            }
            ParameterChange::TravelDiscount(value) => changed.travel_discount = value,
        }
        changed.effective_contact = None;
        changed
    }

    fn validate(&self, index: usize, deterministic: bool) -> Result<()> {
        let n_ages = self.n_age_groups();
        let label = if self.name.is_empty() {
            format!("population {index}")
        } else {
            format!("population {index} ({})", self.name)
        };

        if self.size.iter().any(|&size| !(size >= 0.)) {
            return Err(config_error!("{label}: sizes must be non-negative"));
        }
        if !deterministic && self.size.iter().any(|size| size.fract() != 0.) {
            return Err(config_error!(
                "{label}: sizes must be whole numbers in stochastic runs"
            ));
        }
        if self.matrices.is_empty() {
            return Err(config_error!("{label}: at least one contact matrix is required"));
        }
        validate_matrices(&label, &self.matrices, n_ages)?;
        if !self.contact.is_empty() && self.contact.len() != self.matrices.len() {
            return Err(config_error!(
                "{label}: {} contact multipliers for {} matrices",
                self.contact.len(),
                self.matrices.len()
            ));
        }

        for (name, values) in [
            ("susceptibility", &self.susceptibility),
            ("symptomatic_fraction", &self.symptomatic_fraction),
            ("reporting_fraction", &self.reporting_fraction),
            ("infectiousness_presymptomatic", &self.infectiousness_presymptomatic),
            ("infectiousness_asymptomatic", &self.infectiousness_asymptomatic),
            ("infectiousness_symptomatic", &self.infectiousness_symptomatic),
            ("travel_discount", &self.travel_discount),
        ] {
            validate_age_vector(&label, name, values, n_ages)?;
        }
        for (name, values) in [
            ("symptomatic_fraction", &self.symptomatic_fraction),
            ("reporting_fraction", &self.reporting_fraction),
        ] {
            if values.iter().any(|&p| p > 1.) {
                return Err(config_error!("{label}: {name} must be a probability"));
            }
        }

        let mut last_time = f64::NEG_INFINITY;
        for seed in &self.seeds {
            if seed.time < last_time {
                return Err(config_error!("{label}: seeding events must be ordered by time"));
            }
            last_time = seed.time;
            validate_age_vector(&label, "seed weights", &seed.weights, n_ages)?;
            let total: f64 = seed.weights.iter().sum();
            if (total - 1.).abs() > WEIGHT_TOLERANCE {
                return Err(config_error!(
                    "{label}: seed weights at t={} sum to {total}",
                    seed.time
                ));
            }
            if !(seed.count >= 0.) || (!deterministic && seed.count.fract() != 0.) {
                return Err(config_error!(
                    "{label}: invalid seed count {} at t={}",
                    seed.count,
                    seed.time
                ));
            }
        }

        let mut last_time = f64::NEG_INFINITY;
        for entry in &self.schedule {
            if entry.time < last_time {
                return Err(config_error!("{label}: schedule must be ordered by time"));
            }
            last_time = entry.time;
            let name = entry.change.name();
            match &entry.change {
                ParameterChange::Contact(values) => {
                    if values.len() != self.matrices.len() {
                        return Err(config_error!(
                            "{label}: scheduled {name} at t={} has {} entries for {} matrices",
                            entry.time,
                            values.len(),
                            self.matrices.len()
                        ));
                    }
                }
                ParameterChange::Matrices(matrices) => {
                    validate_matrices(&label, matrices, n_ages)?;
                    if !self.contact.is_empty() && matrices.len() != self.contact.len() {
                        return Err(config_error!(
                            "{label}: scheduled matrices at t={} do not match contact multipliers",
                            entry.time
                        ));
                    }
                }
                ParameterChange::Susceptibility(values)
                | ParameterChange::SymptomaticFraction(values)
                | ParameterChange::ReportingFraction(values)
                | ParameterChange::InfectiousnessPresymptomatic(values)
                | ParameterChange::InfectiousnessAsymptomatic(values)
                | ParameterChange::InfectiousnessSymptomatic(values)
                | ParameterChange::TravelDiscount(values) => {
                    validate_age_vector(&label, name, values, n_ages)?
                }
            }
        }

        Ok(())
    }
}

fn validate_matrices(label: &str, matrices: &[Matrix], n_ages: usize) -> Result<()> {
    for matrix in matrices {
        if matrix.size() != n_ages {
            return Err(config_error!(
                "{label}: contact matrix of size {} for {n_ages} age groups",
                matrix.size()
            ));
        }
        if matrix.has_negative_entries() {
            return Err(config_error!("{label}: contact matrices must be non-negative"));
        }
    }
    Ok(())
}

fn validate_age_vector(label: &str, name: &str, values: &[f64], n_ages: usize) -> Result<()> {
    if values.len() != n_ages {
        return Err(config_error!(
            "{label}: {name} has {} entries for {n_ages} age groups",
            values.len()
        ));
    }
    if values.iter().any(|&value| !(value >= 0.)) {
        return Err(config_error!("{label}: {name} must be non-negative"));
    }
    Ok(())
}

/// Complete configuration of a simulation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Parameters {
    /// Time of the first step.
    pub time0: f64,

    /// Last reported time.
    pub time1: f64,

    /// Length of a simulation step.
    pub time_step: f64,

    /// Number of steps per unit of reported time, `time_step * report_every == 1`.
    #[serde(default = "default_report_every")]
    pub report_every: usize,

    /// Use expectations instead of random draws.
    #[serde(default)]
    pub deterministic: bool,

    /// Mixing between subpopulations, `travel[source][destination]`.
    pub travel: Matrix,

    pub populations: Vec<PopulationParameters>,

    #[serde(default)]
    pub processes: Vec<ProcessDefinition>,
}

fn default_report_every() -> usize {
    1
}

impl Parameters {
    pub fn n_populations(&self) -> usize {
        self.populations.len()
    }

    pub fn n_age_groups(&self) -> usize {
        self.populations
            .first()
            .map(PopulationParameters::n_age_groups)
            .unwrap_or_default()
    }

    /// Number of steps covering `[time0, time1 + 1)`.
    pub fn n_steps(&self) -> usize {
        ((1. + self.time1 - self.time0) / self.time_step).round() as usize
    }

    /// Check all invariants that do not depend on the simulation state.
    pub fn validate(&self) -> Result<()> {
        if !(self.time_step > 0.) {
            return Err(config_error!("time_step must be positive"));
        }
        if !(self.time1 >= self.time0) {
            return Err(config_error!(
                "time1 ({}) precedes time0 ({})",
                self.time1,
                self.time0
            ));
        }
        self.validate_reporting()?;
        if self.populations.is_empty() {
            return Err(config_error!("at least one population is required"));
        }
        if self.travel.size() != self.n_populations() {
            return Err(config_error!(
                "travel matrix of size {} for {} populations",
                self.travel.size(),
                self.n_populations()
            ));
        }
        if self.travel.has_negative_entries() {
            return Err(config_error!("travel matrix must be non-negative"));
        }

        let n_ages = self.n_age_groups();
        for (index, population) in self.populations.iter().enumerate() {
            if population.n_age_groups() != n_ages {
                return Err(config_error!(
                    "population {index} has {} age groups, expected {n_ages}",
                    population.n_age_groups()
                ));
            }
            population.validate(index, self.deterministic)?;
        }

        for process in &self.processes {
            if process.probabilities.len() != n_ages {
                return Err(config_error!(
                    "process from {:?} has {} probability rows for {n_ages} age groups",
                    process.source,
                    process.probabilities.len()
                ));
            }
            for row in &process.probabilities {
                if row.len() != process.compartments.len() {
                    return Err(config_error!(
                        "process from {:?} has {} probabilities for {} compartments",
                        process.source,
                        row.len(),
                        process.compartments.len()
                    ));
                }
                let total: f64 = row.iter().sum();
                if row.iter().any(|&p| !(p >= 0.)) || (total - 1.).abs() > WEIGHT_TOLERANCE {
                    return Err(config_error!(
                        "process from {:?} has invalid probabilities {row:?}",
                        process.source
                    ));
                }
            }
        }

        Ok(())
    }

    /// Check that `report_every` steps make up one unit of reported time.
    pub(crate) fn validate_reporting(&self) -> Result<()> {
        if self.report_every == 0
            || (self.time_step * self.report_every as f64 - 1.).abs() > REPORTING_TOLERANCE
        {
            return Err(config_error!(
                "time_step {} does not evenly divide a reporting interval with {} steps",
                self.time_step,
                self.report_every
            ));
        }
        Ok(())
    }

    pub fn write(&self, writer: &mut dyn std::io::Write) -> std::result::Result<(), SettingsError> {
        serde_yaml::to_writer(writer, self).map_err(SettingsError::YamlError)
    }

    pub fn read(reader: &mut dyn std::io::Read) -> std::result::Result<Parameters, SettingsError> {
        serde_yaml::from_reader(reader).map_err(SettingsError::YamlError)
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut output = vec![];
        self.write(&mut output).map_err(|_| fmt::Error)?;
        write!(formatter, "{}", String::from_utf8_lossy(&output))
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn valid_fixture() {
        assert_eq!(parameters(vec![population()]).validate(), Ok(()));
    }

    #[test]
    fn reject_step_report_mismatch() {
        let mut parameters = parameters(vec![population()]);
        parameters.time_step = 0.3;
        parameters.report_every = 3;
        assert!(parameters.validate().is_err());
        parameters.time_step = 0.25;
        parameters.report_every = 4;
        assert_eq!(parameters.validate(), Ok(()));
        assert_eq!(parameters.n_steps(), 124);
    }

    #[test]
    fn reject_wrong_dimensions() {
        let mut first = parameters(vec![population()]);
        first.populations[0].susceptibility = vec![1.];
        assert!(first.validate().is_err());

        let mut second = parameters(vec![population(), population()]);
        second.travel = Matrix::identity(3);
        assert!(second.validate().is_err());

        let mut third = parameters(vec![population()]);
        third.populations[0].seeds[0].weights = vec![0.5, 0.];
        assert!(third.validate().is_err());
    }

    #[test]
    fn reject_fractional_stochastic_seed() {
        let mut parameters = parameters(vec![population()]);
        parameters.populations[0].seeds[0].count = 2.5;
        assert_eq!(parameters.validate(), Ok(()));
        parameters.deterministic = false;
        assert!(parameters.validate().is_err());
    }

    #[test]
    fn reject_fractional_stochastic_size() {
        let mut parameters = parameters(vec![population()]);
        parameters.populations[0].size = vec![10.6, 1000.];
        assert_eq!(parameters.validate(), Ok(()));
        parameters.deterministic = false;
        assert!(parameters.validate().is_err());
        parameters.populations[0].size = vec![11., 1000.];
        assert_eq!(parameters.validate(), Ok(()));
    }

    #[test]
    fn changes_are_applied_to_a_copy() {
        let mut population = population();
        population.matrices.push(Matrix::from_vec(vec![vec![0., 1.], vec![1., 0.]]).unwrap());
        population.contact = vec![1., 1.];
        population.recalculate();
        assert_eq!(population.contact_rate(0, 1), 1.);

        let mut changed = population.with_change(&ParameterChange::Contact(vec![1., 0.25]));
        changed.recalculate();
        assert_eq!(changed.contact_rate(0, 1), 0.25);
        assert_eq!(changed.contact_rate(0, 0), 1.);
        let uncached = population.with_change(&ParameterChange::Contact(vec![1., 0.25]));
        assert_eq!(uncached.contact_matrix(), changed.contact_matrix());
        assert_eq!(population.contact_rate(0, 1), 1.);
    }

    #[test]
    fn read_write() {
        let parameters = parameters(vec![population(), population()]);
        let mut output = vec![];
        parameters.write(&mut output).unwrap();
        let read = Parameters::read(&mut &output[..]).unwrap();
        assert_eq!(read, parameters);
    }
}
