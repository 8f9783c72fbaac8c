use ndarray::{Array1, Axis, s};

use crate::core::Results;

/// Trait extension to summarize a column of the result grid per population
pub trait ResultsSummary {
    /// Column summed over age groups, one entry per reported time.
    fn aggregate(&self, population: usize, column: usize) -> Array1<f64>;

    /// Column summed over age groups and time.
    fn total(&self, population: usize, column: usize) -> f64;

    /// Time and value of the maximum of the aggregated column.
    fn peak(&self, population: usize, column: usize) -> (f64, f64);
}

impl ResultsSummary for Results {
    fn aggregate(&self, population: usize, column: usize) -> Array1<f64> {
        self.grid()
            .slice(s![.., population, .., column])
            .sum_axis(Axis(1))
    }

    fn total(&self, population: usize, column: usize) -> f64 {
        self.grid().slice(s![.., population, .., column]).sum()
    }

    /// The first maximum wins on ties.
    fn peak(&self, population: usize, column: usize) -> (f64, f64) {
        let (row, value) = self
            .aggregate(population, column)
            .iter()
            .copied()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (row, value)| {
                if value > best.1 { (row, value) } else { best }
            });
        (self.time0() + row as f64, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures;
    use crate::core::{BUILTIN_COLUMNS, Column};

    fn results() -> Results {
        let mut parameters = fixtures::parameters(vec![fixtures::population(), fixtures::population()]);
        parameters.time0 = 10.;
        parameters.time1 = 14.;
        let columns = BUILTIN_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut results = Results::new(&parameters, columns).unwrap();
        let cases = Column::Cases.index();
        for (t, first, second) in [(10., 1., 0.), (11., 3., 2.), (12., 5., 0.), (13., 5., 0.)] {
            *results.cell_mut(t, 1, 0, cases) = first;
            *results.cell_mut(t, 1, 1, cases) = second;
        }
        results
    }

    #[test]
    fn aggregate_over_age_groups() {
        let results = results();
        let cases = Column::Cases.index();
        assert_eq!(results.aggregate(1, cases).to_vec(), vec![1., 5., 5., 5., 0.]);
        assert_eq!(results.total(1, cases), 16.);
        assert_eq!(results.total(0, cases), 0.);
    }

    #[test]
    fn first_peak_wins() {
        let results = results();
        assert_eq!(results.peak(1, Column::Cases.index()), (11., 5.));
        assert_eq!(results.peak(0, Column::Cases.index()), (10., 0.));
    }
}
