//! Statistics and metric trait implementations

pub mod results;

pub use results::ResultsSummary;
