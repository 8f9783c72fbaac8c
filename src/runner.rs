use anyhow::{Context, Result};

use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;

use crate::args::Args;
use crate::config::Settings;
use crate::core::{Column, Observer, Unobserved, UntilExtinction, seeded_streams};
use crate::readwrite::ResultsIO;
use crate::simulation::run_simulation;
use crate::stats::ResultsSummary;

pub struct Runner {
    args: Args,
    settings: Settings,
}

impl Runner {
    pub fn new(args: Args) -> Result<Runner> {
        Self::setup_logger(&args);
        #[cfg(feature = "parallel")]
        Self::setup_rayon(&args);

        let mut settings = Self::load_settings(&args.settings)?;
        if let Some(runs) = args.runs {
            settings.runs = runs;
        }
        if let Some(seed) = args.seed {
            settings.seed = seed;
        }
        settings.parameters.validate()?;

        Ok(Self { args, settings })
    }

    pub fn start(&mut self) -> Result<()> {
        self.run()?;
        log::info!("Results written to {}.", self.args.output);
        Ok(())
    }

    /// Setup logging level and file
    fn setup_logger(args: &Args) {
        let log_level = match args.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };
        simple_logging::log_to_file(args.log_file.as_str(), log_level).unwrap_or_else(|_| {
            eprintln!("Unable to open log file.");
            std::process::exit(1);
        });
    }

    /// Setup rayon thread pool
    #[cfg(feature = "parallel")]
    fn setup_rayon(args: &Args) {
        if let Some(n_threads) = args.threads {
            println!("Setting number of threads to {}.", n_threads);
            rayon::ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .build_global()
                .unwrap_or_else(|_| {
                    eprintln!("Unable to set number of threads.");
                    std::process::exit(1);
                });
        }
    }

    /// Load settings from file
    fn load_settings(path: &str) -> Result<Settings> {
        let settings = Settings::read_from_file(path)
            .with_context(|| format!("Unable to load settings from {path}"))?;
        log::info!("Loaded settings\n{}", settings);
        Ok(settings)
    }

    fn create_progress_bar(&self) -> Result<Option<ProgressBar>> {
        if self.args.disable_progress_bar {
            return Ok(None);
        }
        let bar = ProgressBar::new(self.settings.runs as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40}] {pos:>7}/{len:7} [{elapsed_precise} / {duration_precise}] {msg}")?
                .progress_chars("=> "),
        );
        Ok(Some(bar))
    }

    fn run(&self) -> Result<()> {
        let output = Path::new(self.args.output.as_str());
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create output directory {parent:?}"))?;
        }
        let mut writer = csv::Writer::from_path(output)
            .with_context(|| format!("Unable to create output file {output:?}"))?;

        let parameters = &self.settings.parameters;
        let n_populations = parameters.n_populations();
        let observer: &dyn Observer = if self.settings.stop_on_extinction {
            &UntilExtinction
        } else {
            &Unobserved
        };
        let bar = self.create_progress_bar()?;

        for run in 0..self.settings.runs {
            let seed = self
                .settings
                .seed
                .wrapping_add((run * n_populations) as u64);
            log::info!("Starting run {run} with seed {seed}.");

            let streams = seeded_streams(seed, n_populations);
            let simulation = run_simulation(parameters, streams, observer)
                .with_context(|| format!("Run {run} failed"))?;
            if !simulation.completed {
                log::info!("Run {run} stopped early.");
            }

            let results = &simulation.results;
            let cases: Vec<f64> = (0..n_populations)
                .map(|population| results.total(population, Column::Cases.index()))
                .collect();
            for population in 0..n_populations {
                let (time, value) = results.peak(population, Column::Cases.index());
                log::info!(
                    r###"
        run={run}
        population={population}
        cases={}
        peak_time={time}
        peak_cases={value}"###,
                    cases[population]
                );
            }

            if run == 0 {
                results.write_header(&mut writer)?;
            }
            results.write_records(&mut writer, run)?;

            if let Some(bar) = bar.as_ref() {
                bar.set_position(run as u64 + 1);
                bar.set_message(format!("{cases:?}"));
            }
        }

        writer.flush().context("Unable to write output file")?;
        if let Some(bar) = bar {
            bar.finish_with_message("Done.");
        }
        log::info!("Finished {} runs.", self.settings.runs);
        Ok(())
    }
}
