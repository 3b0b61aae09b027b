use clap::Parser;
use pulsim::cmd::Cli;

fn main() {
    let cli = Cli::parse();
    pulsim::init_logging(&cli.log_level);
    if let Err(e) = cli.command.run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
