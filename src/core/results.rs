//! Result grid
//!
//! Results are stored in a dense `time x population x age group x column` array. Prevalence
//! columns hold a snapshot of the state at each integer time, incidence and outflow columns are
//! summed over all steps that fall into the same unit of time.
//!

use ndarray::{Array4, ArrayView1, ArrayViewMut3, Axis, s};

use crate::config::Parameters;
use crate::errors::{Result, config_error};

/// Names of the columns every simulation reports, in column order.
pub const BUILTIN_COLUMNS: [&str; 9] = [
    "S",
    "E",
    "Ip",
    "Is",
    "Ia",
    "R",
    "cases",
    "cases_reported",
    "subclinical",
];

/// Indices of the built-in columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Susceptible = 0,
    Exposed = 1,
    Presymptomatic = 2,
    Symptomatic = 3,
    Asymptomatic = 4,
    Recovered = 5,
    Cases = 6,
    CasesReported = 7,
    Subclinical = 8,
}

impl Column {
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Results {
    time0: f64,
    columns: Vec<String>,
    grid: Array4<f64>,
}

impl Results {
    pub fn new(parameters: &Parameters, columns: Vec<String>) -> Result<Self> {
        if !(parameters.time1 >= parameters.time0) {
            return Err(config_error!("reporting requires time1 >= time0"));
        }
        parameters.validate_reporting()?;

        let rows = (parameters.time1 - parameters.time0) as usize + 1;
        let grid = Array4::zeros((
            rows,
            parameters.n_populations(),
            parameters.n_age_groups(),
            columns.len(),
        ));

        Ok(Self {
            time0: parameters.time0,
            columns,
            grid,
        })
    }

    pub fn time0(&self) -> f64 {
        self.time0
    }

    pub fn rows(&self) -> usize {
        self.grid.len_of(Axis(0))
    }

    pub fn n_populations(&self) -> usize {
        self.grid.len_of(Axis(1))
    }

    pub fn n_age_groups(&self) -> usize {
        self.grid.len_of(Axis(2))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Row of the grid that time `t` is reported in.
    pub fn row(&self, t: f64) -> usize {
        (t - self.time0).floor() as usize
    }

    pub fn get(&self, t: f64, population: usize, age: usize, column: usize) -> f64 {
        self.grid[[self.row(t), population, age, column]]
    }

    pub fn cell_mut(&mut self, t: f64, population: usize, age: usize, column: usize) -> &mut f64 {
        let row = self.row(t);
        &mut self.grid[[row, population, age, column]]
    }

    /// Time series of one column for one population and age group.
    pub fn series(&self, population: usize, age: usize, column: usize) -> ArrayView1<'_, f64> {
        self.grid.slice(s![.., population, age, column])
    }

    pub fn grid(&self) -> &Array4<f64> {
        &self.grid
    }

    /// Disjoint writable views, one per population.
    pub fn population_views(&mut self) -> Vec<ReportView<'_>> {
        self.grid
            .axis_iter_mut(Axis(1))
            .map(|data| ReportView { data })
            .collect()
    }
}

/// Writable part of the result grid that belongs to a single population.
pub struct ReportView<'a> {
    data: ArrayViewMut3<'a, f64>,
}

impl ReportView<'_> {
    /// Overwrite a prevalence cell.
    pub fn set(&mut self, row: usize, age: usize, column: usize, value: f64) {
        self.data[[row, age, column]] = value;
    }

    /// Accumulate into an incidence or outflow cell.
    pub fn add(&mut self, row: usize, age: usize, column: usize, value: f64) {
        self.data[[row, age, column]] += value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures;

    fn columns() -> Vec<String> {
        BUILTIN_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn dimensions() {
        let parameters = fixtures::parameters(vec![fixtures::population(), fixtures::population()]);
        let results = Results::new(&parameters, columns()).unwrap();
        assert_eq!(results.rows(), 31);
        assert_eq!(results.n_populations(), 2);
        assert_eq!(results.n_age_groups(), 2);
        assert_eq!(results.columns().len(), 9);
        assert_eq!(results.column_index("cases_reported"), Some(7));
        assert_eq!(Column::Subclinical.index(), 8);
    }

    #[test]
    fn reject_step_report_mismatch() {
        let mut parameters = fixtures::parameters(vec![fixtures::population()]);
        parameters.time_step = 0.5;
        assert!(Results::new(&parameters, columns()).is_err());
        parameters.report_every = 2;
        assert!(Results::new(&parameters, columns()).is_ok());
    }

    #[test]
    fn reporting_tolerance_matches_validation() {
        let mut parameters = fixtures::parameters(vec![fixtures::population()]);
        parameters.time_step = 0.3333333;
        parameters.report_every = 3;
        assert_eq!(parameters.validate(), Ok(()));
        assert!(Results::new(&parameters, columns()).is_ok());

        parameters.time_step = 0.33;
        assert!(parameters.validate().is_err());
        assert!(Results::new(&parameters, columns()).is_err());
    }

    #[test]
    fn sub_steps_share_a_row() {
        let mut parameters = fixtures::parameters(vec![fixtures::population()]);
        parameters.time0 = 5.;
        parameters.time_step = 0.25;
        parameters.report_every = 4;
        let mut results = Results::new(&parameters, columns()).unwrap();

        for step in 0..8 {
            let t = 5. + step as f64 * 0.25;
            *results.cell_mut(t, 0, 1, Column::Cases.index()) += 1.;
        }
        assert_eq!(results.get(5., 0, 1, Column::Cases.index()), 4.);
        assert_eq!(results.get(6.75, 0, 1, Column::Cases.index()), 4.);
        assert_eq!(results.row(6.75), 1);
    }

    #[test]
    fn views_are_disjoint() {
        let parameters = fixtures::parameters(vec![fixtures::population(), fixtures::population()]);
        let mut results = Results::new(&parameters, columns()).unwrap();
        {
            let mut views = results.population_views();
            views[0].set(3, 1, Column::Susceptible.index(), 10.);
            views[1].add(3, 1, Column::Cases.index(), 2.);
            views[1].add(3, 1, Column::Cases.index(), 2.);
        }
        assert_eq!(results.get(3., 0, 1, Column::Susceptible.index()), 10.);
        assert_eq!(results.get(3., 1, 1, Column::Susceptible.index()), 0.);
        assert_eq!(results.series(1, 1, Column::Cases.index())[3], 4.);
        assert_eq!(results.get(3., 0, 1, Column::Cases.index()), 0.);
    }
}
