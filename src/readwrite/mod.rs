//! IO traits for writing simulation results.

mod results;

pub use results::ResultsIO;
