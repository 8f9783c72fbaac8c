use std::io;

use crate::core::Results;
use crate::errors::{Result, SimulationError};

/// Flat CSV export of the result grid.
///
/// Every line holds one `(run, time, population, age group)` cell with all columns of the grid.
pub trait ResultsIO {
    fn write_header<W: io::Write>(&self, writer: &mut csv::Writer<W>) -> Result<()>;
    fn write_records<W: io::Write>(&self, writer: &mut csv::Writer<W>, run: usize) -> Result<()>;
}

fn write_error(err: csv::Error) -> SimulationError {
    SimulationError::WriteError(format!("Failed to write results: {err}"))
}

impl ResultsIO for Results {
    fn write_header<W: io::Write>(&self, writer: &mut csv::Writer<W>) -> Result<()> {
        let header = ["run", "t", "population", "group"]
            .into_iter()
            .chain(self.columns().iter().map(String::as_str));
        writer.write_record(header).map_err(write_error)
    }

    fn write_records<W: io::Write>(&self, writer: &mut csv::Writer<W>, run: usize) -> Result<()> {
        let mut record = Vec::with_capacity(4 + self.columns().len());
        for (row, cells) in self.grid().outer_iter().enumerate() {
            let t = self.time0() + row as f64;
            for (population, groups) in cells.outer_iter().enumerate() {
                for (group, values) in groups.outer_iter().enumerate() {
                    record.clear();
                    record.push(run.to_string());
                    record.push(t.to_string());
                    record.push(population.to_string());
                    record.push(group.to_string());
                    record.extend(values.iter().map(f64::to_string));
                    writer.write_record(&record).map_err(write_error)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fixtures;
    use crate::core::{BUILTIN_COLUMNS, Column};

    #[test]
    fn write_grid() {
        let mut parameters = fixtures::parameters(vec![fixtures::population(), fixtures::population()]);
        parameters.time0 = 2.;
        parameters.time1 = 4.;
        let columns = BUILTIN_COLUMNS.iter().map(|c| c.to_string()).collect();
        let mut results = Results::new(&parameters, columns).unwrap();
        *results.cell_mut(3., 1, 0, Column::Cases.index()) = 7.5;

        let mut writer = csv::Writer::from_writer(vec![]);
        results.write_header(&mut writer).unwrap();
        results.write_records(&mut writer, 3).unwrap();
        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(
            lines[0],
            "run,t,population,group,S,E,Ip,Is,Ia,R,cases,cases_reported,subclinical"
        );
        assert_eq!(lines.len(), 1 + 3 * 2 * 2);
        assert_eq!(lines[1], "3,2,0,0,0,0,0,0,0,0,0,0,0");
        assert_eq!(lines[7], "3,3,1,0,0,0,0,0,0,0,7.5,0,0");
    }
}
