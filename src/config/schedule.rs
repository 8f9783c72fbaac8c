//! Time-triggered events of a subpopulation: seeding of infections and parameter changes.

use serde::{Deserialize, Serialize};

use super::matrix::Matrix;

/// Introduction of `count` exposed individuals at `time`, split over age groups by `weights`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SeedEvent {
    pub time: f64,

    /// Number of individuals seeded. Must be integral for stochastic runs.
    #[serde(default = "default_seed_count")]
    pub count: f64,

    /// Distribution of the seeded individuals over age groups; sums to one.
    pub weights: Vec<f64>,
}

fn default_seed_count() -> f64 {
    1.
}

/// A change to one parameter of a subpopulation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ParameterChange {
    /// Multipliers of the component contact matrices.
    Contact(Vec<f64>),
    /// Replace the component contact matrices.
    Matrices(Vec<Matrix>),
    Susceptibility(Vec<f64>),
    SymptomaticFraction(Vec<f64>),
    ReportingFraction(Vec<f64>),
    InfectiousnessPresymptomatic(Vec<f64>),
    InfectiousnessAsymptomatic(Vec<f64>),
    InfectiousnessSymptomatic(Vec<f64>),
    TravelDiscount(Vec<f64>),
}

impl ParameterChange {
    pub fn name(&self) -> &'static str {
        match self {
            ParameterChange::Contact(_) => "contact",
            ParameterChange::Matrices(_) => "matrices",
            ParameterChange::Susceptibility(_) => "susceptibility",
            ParameterChange::SymptomaticFraction(_) => "symptomatic_fraction",
            ParameterChange::ReportingFraction(_) => "reporting_fraction",
            ParameterChange::InfectiousnessPresymptomatic(_) => "infectiousness_presymptomatic",
            ParameterChange::InfectiousnessAsymptomatic(_) => "infectiousness_asymptomatic",
            ParameterChange::InfectiousnessSymptomatic(_) => "infectiousness_symptomatic",
            ParameterChange::TravelDiscount(_) => "travel_discount",
        }
    }
}

/// A parameter change that takes effect at the first step with time >= `time`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ScheduleEntry {
    pub time: f64,
    #[serde(flatten)]
    pub change: ParameterChange,
}

impl ScheduleEntry {
    pub fn new(time: f64, change: ParameterChange) -> Self {
        Self { time, change }
    }
}
