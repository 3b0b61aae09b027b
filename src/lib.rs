//! Pulse-level simulation of asynchronous timed circuits
//!
//! This crate simulates circuits whose wires carry pulses rather than levels, such as
//! [single flux quantum](https://en.wikipedia.org/wiki/Rapid_single_flux_quantum) logic.
//! Each cell is described by a timed finite state machine: pulses arriving on its inputs trigger
//! transitions, which may fire its outputs after a delay.
//! A transition may impose a dwell time before the cell accepts its next input, or minimal gaps
//! since the last pulse seen on other inputs. Violating them aborts the simulation with a
//! descriptive error.
//!
//! # Usage
//!
//! ```bash
//! # Show available commands
//! pulsim help
//! # Show the cells used by a 4-input sorting network
//! pulsim show sort --times 30,10,40,20
//! # Simulate it, dumping the state of every cell at time 40
//! pulsim run sort --times 30,10,40,20 --dump-at 40
//! # Run it 1000 times with randomly perturbed delays
//! pulsim monte-carlo sort --times 30,10,40,20 --runs 1000
//! ```
//!
//! # Development
//!
//! ## Datastructures
//!
//! A [`Circuit`] is a set of [`Wire`]s and of [`Node`]s. Each node instantiates an [`Element`],
//! built from a declarative [`ElementSpec`] and validated once. Elements are shared between
//! nodes and never mutated: the runtime state of each node is kept by the [`Simulation`].
//!
//! Every wire is produced by at most one node and consumed by at most one node, except the
//! global source wire that starts all input generators.
//!
//! For example, here is a coincidence junction fed by two inputs:
//! ```
//! # use pulsim::{simulate, Circuit};
//! let mut circuit = Circuit::new();
//! let a = circuit.inp_at(&[10.0], Some("a")).unwrap();
//! let b = circuit.inp_at(&[20.0], Some("b")).unwrap();
//! circuit.c(a, b, Some("q")).unwrap();
//! let events = simulate(&circuit, None).unwrap();
//! assert_eq!(events["q"], vec![28.0]);
//! ```
//!
//! ## Cell specifications
//!
//! New cells are declared as transition tables, and may be tweaked per instance with
//! [`Overrides`]:
//! ```
//! # use pulsim::{Circuit, ElementSpec, Overrides, TransitionSpec};
//! let toggle = ElementSpec::new("TOGGLE", &["a"], &["q"])
//!     .transition(TransitionSpec::new("idle", "a", "up").fires("q"))
//!     .transition(TransitionSpec::new("up", "a", "idle"))
//!     .firing_delay(3.0);
//! let mut circuit = Circuit::new();
//! let a = circuit.inp(10.0, 4, Some("a")).unwrap();
//! circuit
//!     .cell(&toggle, &Overrides::new().firing_delay(1.0), &[a], &[Some("q")])
//!     .unwrap();
//! let events = pulsim::simulate(&circuit, None).unwrap();
//! assert_eq!(events["q"], vec![11.0, 31.0]);
//! ```

#![warn(missing_docs)]

pub mod analysis;
pub mod cells;
pub mod circuit;
pub mod cmd;
pub mod error;
pub mod fsm;
pub mod sim;

pub use circuit::{Circuit, Node, NodeId, Wire};
pub use error::Error;
pub use fsm::{Element, ElementSpec, Overrides, TransitionSpec};
pub use sim::{simulate, Simulation, Variability};

/// Install a `tracing` subscriber writing to stderr
///
/// `RUST_LOG` takes precedence over the given level. Calling it again has no effect.
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
