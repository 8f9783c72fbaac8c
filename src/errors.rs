//! All errors that can occur in the metapop library.

use std::fmt;

pub type Result<T> = std::result::Result<T, SimulationError>;

#[derive(Clone, Debug, PartialEq)]
pub enum SimulationError {
    /// The configuration violates an invariant that is checked before the run starts.
    ConfigurationError(String),
    /// A seeding event asked for more exposures than there are susceptibles left.
    InsufficientSusceptibles {
        population: usize,
        age: usize,
        time: f64,
        requested: f64,
        available: f64,
    },
    /// Results could not be written.
    WriteError(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SimulationError::ConfigurationError(message) => {
                write!(f, "ConfigurationError: {}", message)
            }
            SimulationError::InsufficientSusceptibles {
                population,
                age,
                time,
                requested,
                available,
            } => write!(
                f,
                "InsufficientSusceptibles: cannot seed {requested} exposures into age group \
                 {age} of population {population} at t={time}, only {available} susceptible"
            ),
            SimulationError::WriteError(message) => write!(f, "WriteError: {}", message),
        }
    }
}

impl std::error::Error for SimulationError {}

/// Shorthand for building a configuration error from a formatted message.
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::errors::SimulationError::ConfigurationError(format!($($arg)*))
    };
}

pub(crate) use config_error;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_susceptibles() {
        let error = SimulationError::InsufficientSusceptibles {
            population: 1,
            age: 2,
            time: 3.,
            requested: 10.,
            available: 4.,
        };
        let message = error.to_string();
        assert!(message.contains("age group 2"));
        assert!(message.contains("population 1"));
        assert!(message.contains("t=3"));
    }
}
