//! This module contains the core datatypes of the library.

pub mod compartment;
pub mod metapopulation;
pub mod observer;
pub mod population;
pub mod process;
pub mod random;
pub mod results;

pub use compartment::{DelayCompartment, DelaySchedule};
pub use metapopulation::Metapopulation;
pub use observer::{Observer, Unobserved, UntilExtinction};
pub use population::{Step, Subpopulation};
pub use process::{ProcessTable, ReportKind};
pub use random::{Randomizer, Sampler, seeded_streams};
pub use results::{BUILTIN_COLUMNS, Column, ReportView, Results};
