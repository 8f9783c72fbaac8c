//! Coupling of subpopulations
//!
//! Each step, every subpopulation reports its contagiousness per age group. The infectiousness a
//! subpopulation is exposed to is the travel-weighted sum of all contagiousness vectors, where
//! contributions from other subpopulations are discounted by the source's travel discount. The
//! force of infection then follows from the destination's susceptibility and contact matrix.
//!

use super::population::Subpopulation;
use super::random::Randomizer;
use crate::config::Parameters;
use crate::errors::Result;

#[derive(Clone, Debug, Default)]
pub struct Metapopulation {
    contagiousness: Vec<Vec<f64>>,
    infectiousness: Vec<Vec<f64>>,
    force: Vec<Vec<f64>>,
}

fn reset(buffer: &mut Vec<Vec<f64>>, rows: usize, columns: usize) {
    buffer.resize_with(rows, Vec::new);
    for row in buffer.iter_mut() {
        row.clear();
        row.resize(columns, 0.);
    }
}

impl Metapopulation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let every subpopulation seed, apply its schedule and report its contagiousness.
    pub fn compute_contagiousness<R: Randomizer>(
        &mut self,
        parameters: &Parameters,
        populations: &mut [Subpopulation],
        streams: &mut [R],
        time: f64,
    ) -> Result<()> {
        reset(
            &mut self.contagiousness,
            populations.len(),
            parameters.n_age_groups(),
        );
        for ((population, stream), contagiousness) in populations
            .iter_mut()
            .zip(streams.iter_mut())
            .zip(self.contagiousness.iter_mut())
        {
            population.compute_contagiousness(
                parameters.deterministic,
                stream,
                time,
                contagiousness,
            )?;
        }
        Ok(())
    }

    /// Mix the last computed contagiousness over the travel matrix into a force of infection per
    /// subpopulation and age group.
    pub fn mix(&mut self, parameters: &Parameters, populations: &[Subpopulation]) -> &[Vec<f64>] {
        let n_ages = parameters.n_age_groups();
        reset(&mut self.infectiousness, populations.len(), n_ages);
        reset(&mut self.force, populations.len(), n_ages);

        for (i, infectiousness) in self.infectiousness.iter_mut().enumerate() {
            for (j, (source, contagiousness)) in
                populations.iter().zip(&self.contagiousness).enumerate()
            {
                let travel = parameters.travel.get(j, i);
                if travel == 0. {
                    continue;
                }
                let discount = &source.parameters().travel_discount;
                for a in 0..n_ages {
                    let factor = if i == j { 1. } else { discount[a] };
                    infectiousness[a] += travel * contagiousness[a] * factor;
                }
            }
        }

        for ((destination, infectiousness), force) in populations
            .iter()
            .zip(&self.infectiousness)
            .zip(self.force.iter_mut())
        {
            let local = destination.parameters();
            for (a, lambda) in force.iter_mut().enumerate() {
                for (b, infectious) in infectiousness.iter().enumerate() {
                    *lambda += local.susceptibility[a] * local.contact_rate(a, b) * infectious;
                }
            }
        }

        &self.force
    }

    /// Contagiousness followed by mixing.
    pub fn force_of_infection<R: Randomizer>(
        &mut self,
        parameters: &Parameters,
        populations: &mut [Subpopulation],
        streams: &mut [R],
        time: f64,
    ) -> Result<&[Vec<f64>]> {
        self.compute_contagiousness(parameters, populations, streams, time)?;
        Ok(self.mix(parameters, populations))
    }

    pub fn contagiousness(&self) -> &[Vec<f64>] {
        &self.contagiousness
    }

    pub fn infectiousness(&self) -> &[Vec<f64>] {
        &self.infectiousness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Matrix, fixtures};
    use crate::core::{ProcessTable, seeded_streams};

    fn populations(parameters: &Parameters) -> Vec<Subpopulation> {
        let processes = ProcessTable::new(&[]).unwrap();
        parameters
            .populations
            .iter()
            .enumerate()
            .map(|(index, population)| Subpopulation::new(index, population, &processes))
            .collect()
    }

    #[test]
    fn travel_weighted_mixing() {
        let mut first = fixtures::population();
        first.travel_discount = vec![0.5, 0.5];
        let mut second = fixtures::population();
        second.susceptibility = vec![2., 1.];
        let mut parameters = fixtures::parameters(vec![first, second]);
        parameters.travel = Matrix::from_vec(vec![vec![1., 0.2], vec![0.1, 1.]]).unwrap();

        let populations = populations(&parameters);
        let mut metapopulation = Metapopulation::new();
        metapopulation.contagiousness = vec![vec![0.4, 0.], vec![0.2, 0.]];

        let force = metapopulation.mix(&parameters, &populations).to_vec();
        // population 0 receives 0.4 + 0.1 * 0.2 * 1, population 1 receives 0.2 + 0.2 * 0.4 * 0.5
        assert!((metapopulation.infectiousness()[0][0] - 0.42).abs() < 1e-12);
        assert!((metapopulation.infectiousness()[1][0] - 0.24).abs() < 1e-12);
        assert!((force[0][0] - 0.42).abs() < 1e-12);
        assert!((force[1][0] - 0.48).abs() < 1e-12);
        assert_eq!(force[0][1], 0.);
        assert_eq!(force[1][1], 0.);
    }

    #[test]
    fn contact_matrix_couples_age_groups() {
        let mut population = fixtures::population();
        population.matrices = vec![Matrix::from_vec(vec![vec![1., 0.5], vec![2., 1.]]).unwrap()];
        population.contact = vec![0.5];
        let parameters = fixtures::parameters(vec![population]);

        let populations = populations(&parameters);
        let mut metapopulation = Metapopulation::new();
        metapopulation.contagiousness = vec![vec![0.2, 0.4]];

        let force = metapopulation.mix(&parameters, &populations);
        assert!((force[0][0] - 0.5 * (0.2 + 0.5 * 0.4)).abs() < 1e-12);
        assert!((force[0][1] - 0.5 * (2. * 0.2 + 0.4)).abs() < 1e-12);
    }

    #[test]
    fn buffers_follow_population_count() {
        let parameters = fixtures::parameters(vec![fixtures::population(), fixtures::population()]);
        let mut populations = populations(&parameters);
        let mut streams = seeded_streams(0, 2);
        let mut metapopulation = Metapopulation::new();

        let force = metapopulation
            .force_of_infection(&parameters, &mut populations, &mut streams, 0.)
            .unwrap();
        assert_eq!(force.len(), 2);
        assert_eq!(force[1].len(), 2);
        assert_eq!(metapopulation.contagiousness().len(), 2);
        assert_eq!(populations[1].exposed(0), 10.);
    }
}
