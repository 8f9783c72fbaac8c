//! Configuration data structures for simulation setups.

mod matrix;
mod parameters;
mod process;
mod schedule;
mod settings;

pub use matrix::Matrix;
pub use parameters::{Delays, Parameters, PopulationParameters};
pub use process::{BuiltinEvent, ProcessCompartment, ProcessDefinition, ProcessSource};
pub use schedule::{ParameterChange, ScheduleEntry, SeedEvent};
pub use settings::{Settings, SettingsError};

#[cfg(test)]
pub(crate) use parameters::fixtures;
