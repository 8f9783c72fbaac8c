use clap::Parser;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = None,
    name = "metapop",
)]
pub struct Args {
    /// Path to settings (yaml file).
    #[clap(long)]
    pub settings: String,

    /// Path to output (csv file).
    #[clap(long, short)]
    pub output: String,

    /// Number of runs, overrides the settings.
    #[clap(long)]
    pub runs: Option<usize>,

    /// Base seed, overrides the settings.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Path to log file.
    #[clap(long, default_value = "metapop.log")]
    pub log_file: String,

    /// Increase logging verbosity.
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Hide the progress bar.
    #[clap(long)]
    pub disable_progress_bar: bool,

    /// Number of worker threads when built with the `parallel` feature.
    #[clap(long)]
    pub threads: Option<usize>,
}
