//! Compute cell statistics
//!
//! ```
//! # use pulsim::Circuit;
//! # let mut circuit = Circuit::new();
//! # let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
//! # circuit.jtl(a, Some("q")).unwrap();
//! use pulsim::circuit::stats::stats;
//! let stats = stats(&circuit);
//!
//! // Check that there is a single JTL
//! assert_eq!(stats.cells["JTL"], 1);
//!
//! // Show the statistics
//! println!("{}", stats);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::fsm::ElementKind;
use crate::Circuit;

/// Number of wires, inputs and cells in a circuit
#[derive(Clone, Debug, Default)]
pub struct CircuitStats {
    /// Number of wires, including the global source
    pub nb_wires: usize,
    /// Number of observed wires
    pub nb_observed: usize,
    /// Number of input generators
    pub nb_generators: usize,
    /// Number of connections introduced by wire redirection
    pub nb_connections: usize,
    /// Number of behavioral holes
    pub nb_functional: usize,
    /// Number of instances of each cell type
    pub cells: BTreeMap<String, usize>,
    /// Total number of Josephson junctions, for cells that declare it
    pub jjs: u64,
    /// Number of cells that do not declare their junction count
    pub unknown_jjs: usize,
}

impl CircuitStats {
    /// Total number of cells, excluding generators and connections
    pub fn nb_cells(&self) -> usize {
        self.cells.values().sum()
    }
}

impl fmt::Display for CircuitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stats:")?;
        writeln!(f, "  Wires: {}", self.nb_wires)?;
        writeln!(f, "  Observed: {}", self.nb_observed)?;
        writeln!(f, "  Inputs: {}", self.nb_generators)?;
        writeln!(f, "  Cells: {}", self.nb_cells())?;
        for (name, nb) in &self.cells {
            writeln!(f, "      {}: {}", name, nb)?;
        }
        if self.nb_connections != 0 {
            writeln!(f, "  Connections: {}", self.nb_connections)?;
        }
        if self.nb_functional != 0 {
            writeln!(f, "  Holes: {}", self.nb_functional)?;
        }
        write!(f, "  JJs: {}", self.jjs)?;
        if self.unknown_jjs != 0 {
            write!(f, " ({} cells unknown)", self.unknown_jjs)?;
        }
        writeln!(f)
    }
}

/// Compute the statistics of the circuit
pub fn stats(c: &Circuit) -> CircuitStats {
    let mut ret = CircuitStats {
        nb_wires: c.nb_wires(),
        nb_observed: c.observed().count(),
        ..Default::default()
    };
    for n in c.nodes() {
        let e = n.element();
        match e.kind() {
            ElementKind::Source => continue,
            ElementKind::Generator => {
                ret.nb_generators += 1;
                continue;
            }
            ElementKind::Connection => {
                ret.nb_connections += 1;
                continue;
            }
            ElementKind::Functional => ret.nb_functional += 1,
            ElementKind::Cell => (),
        }
        *ret.cells.entry(e.name().to_string()).or_default() += 1;
        match e.jjs() {
            Some(j) => ret.jjs += j as u64,
            None => ret.unknown_jjs += 1,
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::Overrides;

    #[test]
    fn test_stats() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        let b = circuit.inp_at(&[2.0], Some("b")).unwrap();
        let q = circuit.c(a, b, None).unwrap();
        circuit
            .split(q, 3, &["x", "y", "z"], &Overrides::new().jjs(4))
            .unwrap();
        let s = stats(&circuit);
        assert_eq!(s.nb_generators, 2);
        assert_eq!(s.nb_observed, 5);
        assert_eq!(s.cells["C"], 1);
        assert_eq!(s.cells["S"], 2);
        assert_eq!(s.nb_cells(), 3);
        assert_eq!(s.jjs, 5 + 2 * 4);
        assert_eq!(s.unknown_jjs, 0);
        assert!(s.to_string().contains("C: 1"));
    }

    #[test]
    fn test_stats_holes() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        circuit
            .hole("DOUBLE", 1.0, &[a], &["x", "y"], |high, _| vec![high[0], high[0]])
            .unwrap();
        let loopback = circuit.add_wire(None);
        let b = circuit.inp_at(&[1.0], None).unwrap();
        circuit.m(b, loopback, Some("q")).unwrap();
        let c = circuit.add_wire(None);
        let d = circuit.add_wire(None);
        circuit.jtl(c, None).unwrap();
        circuit.redirect(c, d).unwrap();
        let s = stats(&circuit);
        assert_eq!(s.nb_functional, 1);
        assert_eq!(s.nb_connections, 1);
        assert_eq!(s.unknown_jjs, 1);
        assert_eq!(s.jjs, 5 + 2);
    }
}
