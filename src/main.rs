use clap::Parser;
use metapop::args::Args;
use metapop::runner::Runner;

fn main() {
    let args = Args::parse();
    let mut runner = Runner::new(args).unwrap_or_else(|err| {
        eprintln!("Unable to set up simulation: {err:#}.");
        std::process::exit(1);
    });
    if let Err(err) = runner.start() {
        log::error!("Simulation failed: {err:#}");
        eprintln!("Simulation failed: {err:#}.");
        std::process::exit(1);
    }
}
