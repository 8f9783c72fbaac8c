//! Resolved user processes
//!
//! Process definitions name their sources and report flags as strings. Before a simulation starts
//! they are resolved into a `ProcessTable`: every process compartment gets a numeric id, every
//! source is either a built-in event or a compartment id, and every report flag gets a column in
//! the result grid.
//!

use std::collections::HashMap;
use std::ops::Range;

use super::compartment::DelaySchedule;
use super::results::BUILTIN_COLUMNS;
use crate::config::{BuiltinEvent, ProcessDefinition, ProcessSource};
use crate::errors::{Result, config_error};

/// What is reported for a process compartment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReportKind {
    /// Occupancy at integer times.
    Prevalence,
    /// Individuals entering per reported time unit.
    Incidence,
    /// Individuals leaving per reported time unit.
    Outflow,
}

impl ReportKind {
    pub fn from_flag(flag: char) -> Result<Self> {
        match flag {
            'p' => Ok(ReportKind::Prevalence),
            'i' => Ok(ReportKind::Incidence),
            'o' => Ok(ReportKind::Outflow),
            _ => Err(config_error!("unrecognized process report type '{flag}'")),
        }
    }

    pub fn flag(&self) -> char {
        match self {
            ReportKind::Prevalence => 'p',
            ReportKind::Incidence => 'i',
            ReportKind::Outflow => 'o',
        }
    }
}

/// Source of a process with compartment names replaced by ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    Builtin(BuiltinEvent),
    Outflow(usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Process {
    pub source: Source,
    /// Ids of the destination compartments.
    pub compartments: Range<usize>,
    /// Split over the destinations, one row per age group.
    pub probabilities: Vec<Vec<f64>>,
    pub delays: Vec<DelaySchedule>,
}

/// A result column fed by a process compartment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReportColumn {
    pub column: usize,
    pub compartment: usize,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProcessTable {
    processes: Vec<Process>,
    names: Vec<String>,
    columns: Vec<String>,
    prevalence: Vec<ReportColumn>,
    incidence: Vec<ReportColumn>,
    outflow: Vec<ReportColumn>,
}

impl ProcessTable {
    pub fn new(definitions: &[ProcessDefinition]) -> Result<Self> {
        let mut table = Self {
            columns: BUILTIN_COLUMNS.iter().map(|name| name.to_string()).collect(),
            ..Self::default()
        };

        // number compartments first, sources may refer to later processes
        let mut ids: HashMap<&str, usize> = HashMap::new();
        for compartment in definitions.iter().flat_map(|d| &d.compartments) {
            let id = table.names.len();
            if ids.insert(compartment.name.as_str(), id).is_some() {
                return Err(config_error!(
                    "duplicate process compartment name '{}'",
                    compartment.name
                ));
            }
            table.names.push(compartment.name.clone());
        }

        let mut next_id = 0;
        for definition in definitions {
            let source = match &definition.source {
                ProcessSource::Builtin(event) => Source::Builtin(*event),
                ProcessSource::Outflow(name) => match ids.get(name.as_str()) {
                    Some(&id) => Source::Outflow(id),
                    None => {
                        return Err(config_error!("unknown process source '{name}'"));
                    }
                },
            };

            let compartments = next_id..next_id + definition.compartments.len();
            next_id = compartments.end;

            for (id, compartment) in compartments.clone().zip(&definition.compartments) {
                for flag in compartment.report.chars() {
                    let kind = ReportKind::from_flag(flag)?;
                    let report = ReportColumn {
                        column: table.columns.len(),
                        compartment: id,
                    };
                    table.columns.push(format!("{}_{}", compartment.name, kind.flag()));
                    match kind {
                        ReportKind::Prevalence => table.prevalence.push(report),
                        ReportKind::Incidence => table.incidence.push(report),
                        ReportKind::Outflow => table.outflow.push(report),
                    }
                }
            }

            table.processes.push(Process {
                source,
                compartments,
                probabilities: definition.probabilities.clone(),
                delays: definition
                    .compartments
                    .iter()
                    .map(|compartment| compartment.delay.clone())
                    .collect(),
            });
        }

        Ok(table)
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn n_compartments(&self) -> usize {
        self.names.len()
    }

    pub fn compartment_name(&self, id: usize) -> &str {
        &self.names[id]
    }

    /// Names of all result columns, built-in columns first.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn prevalence_columns(&self) -> &[ReportColumn] {
        &self.prevalence
    }

    pub fn incidence_columns(&self) -> &[ReportColumn] {
        &self.incidence
    }

    pub fn outflow_columns(&self) -> &[ReportColumn] {
        &self.outflow
    }
}
