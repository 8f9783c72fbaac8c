//! User-defined processes branching off the built-in disease progression.

use serde::{Deserialize, Serialize};

use crate::core::DelaySchedule;

/// Built-in transition events that can feed a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuiltinEvent {
    /// S -> E, new infections.
    Infection,
    /// Leaving E, both symptomatic and asymptomatic.
    Incubation,
    /// E -> Ip
    PresymptomaticOnset,
    /// E -> Ia
    AsymptomaticOnset,
    /// Ip -> Is, onset of symptoms.
    SymptomOnset,
    /// Is -> H
    Hospitalization,
    /// H -> R
    Discharge,
    /// Ia -> R
    AsymptomaticRecovery,
    /// H -> R and Ia -> R
    Recovery,
}

impl BuiltinEvent {
    const CODES: [(&'static str, BuiltinEvent); 9] = [
        ("S", BuiltinEvent::Infection),
        ("E", BuiltinEvent::Incubation),
        ("Ep", BuiltinEvent::PresymptomaticOnset),
        ("Ea", BuiltinEvent::AsymptomaticOnset),
        ("Ip", BuiltinEvent::SymptomOnset),
        ("Is", BuiltinEvent::Hospitalization),
        ("H", BuiltinEvent::Discharge),
        ("Ia", BuiltinEvent::AsymptomaticRecovery),
        ("I", BuiltinEvent::Recovery),
    ];

    pub fn from_code(code: &str) -> Option<Self> {
        Self::CODES
            .iter()
            .find(|(name, _)| *name == code)
            .map(|(_, event)| *event)
    }

    pub fn code(&self) -> &'static str {
        Self::CODES
            .iter()
            .find(|(_, event)| event == self)
            .map(|(name, _)| *name)
            .unwrap_or_default()
    }
}

/// Where the individuals entering a process come from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProcessSource {
    Builtin(BuiltinEvent),
    /// Outflow of a process compartment, by name.
    Outflow(String),
}

impl From<String> for ProcessSource {
    fn from(code: String) -> Self {
        match BuiltinEvent::from_code(&code) {
            Some(event) => ProcessSource::Builtin(event),
            None => ProcessSource::Outflow(code),
        }
    }
}

impl From<ProcessSource> for String {
    fn from(source: ProcessSource) -> Self {
        match source {
            ProcessSource::Builtin(event) => event.code().to_string(),
            ProcessSource::Outflow(name) => name,
        }
    }
}

/// Destination of a process.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProcessCompartment {
    pub name: String,

    pub delay: DelaySchedule,

    /// Report flags: `p` prevalence, `i` incidence, `o` outflow.
    #[serde(default)]
    pub report: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProcessDefinition {
    pub source: ProcessSource,

    pub compartments: Vec<ProcessCompartment>,

    /// Probability of entering each compartment, one row per age group.
    pub probabilities: Vec<Vec<f64>>,
}
