//! Representation of pulse circuits: wires, and nodes instantiating cells

mod circuit;
pub mod generators;
mod node;
pub mod stats;
mod wire;

pub use circuit::Circuit;
pub use node::{Node, NodeId};
pub use wire::{is_temporary_name, Wire, SOURCE_WIRE, TEMPORARY_PREFIX};
