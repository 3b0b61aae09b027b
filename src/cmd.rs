//! Command line interface

use std::collections::BTreeMap;

use clap::{Args, Parser, Subcommand, ValueEnum};
use itertools::Itertools;
use kdam::{tqdm, BarExt};
use thiserror::Error;
use tracing::{info, warn};

use crate::circuit::generators::{coincidence, fanout, feedback, line, race};
use crate::circuit::stats::stats;
use crate::sim::{Events, Selector, Simulation, Variability};
use crate::{Circuit, Overrides};

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log level, unless overridden by RUST_LOG
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Command line arguments
#[derive(Subcommand)]
pub enum Commands {
    /// Show statistics about a demo circuit
    ///
    /// Will print the number of wires, inputs and cells, and the total junction count.
    #[clap()]
    Show(ShowArgs),

    /// Simulate a demo circuit
    ///
    /// Prints the pulse times on every observed wire. Circuits with feedback loops need a
    /// horizon (--until).
    #[clap(alias = "sim")]
    Run(RunArgs),

    /// Simulate a demo circuit many times with perturbed delays
    ///
    /// Each run uses a different seed. Prints the spread of every observed pulse.
    #[clap(alias = "mc")]
    MonteCarlo(MonteCarloArgs),
}

impl Commands {
    /// Execute the command
    pub fn run(&self) -> Result<(), CliError> {
        match self {
            Commands::Show(a) => a.run(),
            Commands::Run(a) => a.run(),
            Commands::MonteCarlo(a) => a.run(),
        }
    }
}

/// Failure of a command
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid circuit or failed simulation
    #[error(transparent)]
    Circuit(#[from] crate::Error),
    /// Failure to write the output
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Failure to serialize a state dump
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Simulation of a feedback loop without a horizon
    #[error("The {0:?} demo contains a feedback loop and needs a horizon (--until)")]
    MissingHorizon(Demo),
    /// Same pulse observed a different number of times across runs
    #[error("Wire '{0}' pulsed a different number of times across runs")]
    Unstable(String),
}

/// Demo circuits
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// Chain of JTLs
    Chain,
    /// Tree of splitters
    Split,
    /// Tree of C elements
    Coincidence,
    /// Merger looping back on itself
    Ring,
    /// Race-logic sorting network
    Sort,
}

/// Selection and parameters of the demo circuit
#[derive(Args)]
pub struct CircuitArgs {
    /// Circuit to build
    #[arg(value_enum)]
    demo: Demo,

    /// Size of the circuit: length of the chain or ring, number of outputs or inputs
    #[arg(short = 'n', long, default_value_t = 4)]
    size: usize,

    /// Input pulse times; one value per input for the sorting network
    #[arg(short = 't', long, value_delimiter = ',', default_values_t = [10.0, 40.0])]
    times: Vec<f64>,

    /// Period of the input rounds of the coincidence tree
    #[arg(long, default_value_t = 50.0)]
    period: f64,

    /// Per-instance overrides of the cells, as key=value
    #[arg(long = "set")]
    overrides: Vec<String>,
}

impl CircuitArgs {
    fn overrides(&self) -> Result<Overrides, crate::Error> {
        let mut ret = Overrides::new();
        for o in &self.overrides {
            ret.parse_assignment(o)?;
        }
        Ok(ret)
    }

    /// Reject simulations that would never terminate
    fn check_horizon(&self, until: Option<f64>) -> Result<(), CliError> {
        if self.demo == Demo::Ring && until.is_none() {
            return Err(CliError::MissingHorizon(self.demo));
        }
        Ok(())
    }

    /// Build the demo circuit
    pub fn build(&self) -> Result<Circuit, crate::Error> {
        let overrides = self.overrides()?;
        if !overrides.is_empty() && !matches!(self.demo, Demo::Chain | Demo::Split) {
            warn!("Overrides are ignored by the {:?} demo", self.demo);
        }
        let ret = match self.demo {
            Demo::Chain => line::jtl(self.size, &self.times, &overrides)?,
            Demo::Split => fanout::split_tree(self.size, &self.times, &overrides)?,
            Demo::Coincidence => coincidence::c_tree(self.size, self.period, self.times.len())?,
            Demo::Ring => feedback::ring(self.size)?,
            Demo::Sort => race::sorting_network(&self.times)?,
        };
        info!(
            "Built {:?} demo with {} nodes and {} wires",
            self.demo,
            ret.nb_nodes(),
            ret.nb_wires()
        );
        Ok(ret)
    }
}

/// Command arguments for circuit informations
#[derive(Args)]
pub struct ShowArgs {
    #[command(flatten)]
    circuit: CircuitArgs,
}

impl ShowArgs {
    /// Execute the command
    pub fn run(&self) -> Result<(), CliError> {
        let circuit = self.circuit.build()?;
        println!("Circuit stats:\n{}", stats(&circuit));
        Ok(())
    }
}

/// Command arguments for simulation
#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    circuit: CircuitArgs,

    /// Stop the simulation after this time
    #[arg(short = 'u', long)]
    until: Option<f64>,

    /// Perturb the firing delays, with this random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Print the state of the circuit as JSON once this time is reached
    #[arg(long)]
    dump_at: Option<f64>,
}

impl RunArgs {
    /// Execute the command
    pub fn run(&self) -> Result<(), CliError> {
        self.circuit.check_horizon(self.until)?;
        let circuit = self.circuit.build()?;
        let mut sim = Simulation::new(&circuit);
        if let Some(t) = self.until {
            sim = sim.until(t);
        }
        if let Some(s) = self.seed {
            sim = sim.variability(perturbed_cells(s));
        }
        if let Some(t) = self.dump_at {
            sim.run_to(t).map_err(crate::Error::from)?;
            println!("{}", sim.dump().to_json()?);
        }
        while sim.step().map_err(crate::Error::from)?.is_some() {}
        print_events(sim.events());
        print!("{}", sim.stats());
        Ok(())
    }
}

/// Command arguments for Monte-Carlo analysis
#[derive(Args)]
pub struct MonteCarloArgs {
    #[command(flatten)]
    circuit: CircuitArgs,

    /// Stop each simulation after this time
    #[arg(short = 'u', long)]
    until: Option<f64>,

    /// Number of runs
    #[arg(short = 'r', long, default_value_t = 100)]
    runs: u64,

    /// Random seed of the first run
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

impl MonteCarloArgs {
    /// Execute the command
    pub fn run(&self) -> Result<(), CliError> {
        self.circuit.check_horizon(self.until)?;
        let circuit = self.circuit.build()?;
        let mut samples: BTreeMap<String, Vec<Vec<f64>>> = BTreeMap::new();
        let mut progress = tqdm!(total = self.runs as usize);
        progress.set_description("Runs");
        for r in 0..self.runs {
            let mut sim = Simulation::new(&circuit).variability(perturbed_cells(self.seed + r));
            if let Some(t) = self.until {
                sim = sim.until(t);
            }
            let events = sim.simulate().map_err(crate::Error::from)?;
            for (alias, times) in events {
                let s = samples
                    .entry(alias.clone())
                    .or_insert_with(|| vec![Vec::new(); times.len()]);
                if s.len() != times.len() {
                    return Err(CliError::Unstable(alias));
                }
                for (k, t) in times.into_iter().enumerate() {
                    s[k].push(t);
                }
            }
            progress.update(1)?;
        }
        progress.refresh()?;
        eprintln!();
        for (alias, pulses) in &samples {
            for (k, ts) in pulses.iter().enumerate() {
                let (min, max) = match ts.iter().copied().minmax_by(f64::total_cmp).into_option() {
                    Some(m) => m,
                    None => continue,
                };
                let mean = ts.iter().sum::<f64>() / ts.len() as f64;
                println!("{alias}[{k}]: {min:.3} .. {max:.3} (mean {mean:.3})");
            }
        }
        Ok(())
    }
}

/// Default perturbation of every cell, leaving the input pulses untouched
fn perturbed_cells(seed: u64) -> Variability {
    Variability::gaussian(seed).exclude(Selector::Kind(crate::fsm::ElementKind::Generator))
}

fn print_events(events: &Events) {
    for (alias, times) in events {
        println!("{}: {}", alias, times.iter().join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_needs_horizon() {
        let cli = Cli::try_parse_from(["pulsim", "run", "ring", "-n", "3"]).unwrap();
        assert!(matches!(
            cli.command.run(),
            Err(CliError::MissingHorizon(Demo::Ring))
        ));
        let cli = Cli::try_parse_from(["pulsim", "mc", "ring", "-r", "2"]).unwrap();
        assert!(matches!(
            cli.command.run(),
            Err(CliError::MissingHorizon(Demo::Ring))
        ));
        let cli = Cli::try_parse_from(["pulsim", "run", "ring", "-n", "3", "-u", "60"]).unwrap();
        assert!(cli.command.run().is_ok());
    }

    #[test]
    fn test_demo_args() {
        let cli = Cli::try_parse_from(["pulsim", "show", "sort", "-t", "30,10,40,20"]).unwrap();
        let Commands::Show(args) = &cli.command else {
            panic!("expected the show command");
        };
        assert_eq!(args.circuit.times, vec![30.0, 10.0, 40.0, 20.0]);
        assert!(args.circuit.build().is_ok());
        assert!(cli.command.run().is_ok());
    }
}
