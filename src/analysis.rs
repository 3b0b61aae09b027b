//! Static timing introspection of a circuit
//!
//! ```
//! # use pulsim::Circuit;
//! use pulsim::analysis::{delay, path_delay, DelayInfo};
//! let mut circuit = Circuit::new();
//! let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
//! let b = circuit.jtl(a, None).unwrap();
//! let q = circuit.jtl(b, Some("q")).unwrap();
//! assert_eq!(delay(&circuit, q).unwrap(), DelayInfo::Single(5.7));
//! assert_eq!(path_delay(&circuit, a, q), Some(5.7 + 5.7));
//! ```

use fxhash::FxHashSet;
use itertools::Itertools;
use tracing::warn;

use crate::circuit::{Circuit, NodeId, Wire};
use crate::error::TopologyError;

/// Firing delay of a wire
#[derive(Debug, Clone, PartialEq)]
pub enum DelayInfo {
    /// All transitions firing the wire use the same delay
    Single(f64),
    /// Transitions firing the wire use different delays, in increasing order
    Multiple(Vec<f64>),
}

impl DelayInfo {
    /// Largest delay
    pub fn max(&self) -> f64 {
        match self {
            DelayInfo::Single(d) => *d,
            DelayInfo::Multiple(v) => v.iter().copied().fold(0.0, f64::max),
        }
    }
}

/// Firing delay associated with the transitions producing a wire
pub fn delay(circuit: &Circuit, w: Wire) -> Result<DelayInfo, TopologyError> {
    let Some(id) = circuit.producer(w) else {
        return Err(TopologyError::NoProducer(circuit.name(w).to_string()));
    };
    let node = circuit.node(id);
    let Some(port) = node.output_port(w) else {
        return Err(TopologyError::NoProducer(circuit.name(w).to_string()));
    };
    let delays: Vec<f64> = node
        .element()
        .output_delays(port)
        .into_iter()
        .sorted_by(f64::total_cmp)
        .dedup()
        .collect();
    match delays.as_slice() {
        [] => Ok(DelayInfo::Single(0.0)),
        [d] => Ok(DelayInfo::Single(*d)),
        _ => {
            warn!(
                "Wire {} is fired with several delays: {}",
                circuit.name(w),
                delays.iter().join(", ")
            );
            Ok(DelayInfo::Multiple(delays))
        }
    }
}

/// A path through the circuit: each node, and the wire it drives towards the next one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    /// Nodes along the path
    pub nodes: Vec<NodeId>,
    /// Output wire taken from each node
    pub wires: Vec<Wire>,
}

/// Enumerate the acyclic paths from the consumers of `src` to the producer of `dst`
pub fn paths(circuit: &Circuit, src: Wire, dst: Wire) -> Vec<Path> {
    let mut ret = Vec::new();
    let mut current = Path {
        nodes: Vec::new(),
        wires: Vec::new(),
    };
    let mut visited = FxHashSet::default();
    explore(circuit, src, dst, &mut current, &mut visited, &mut ret);
    ret
}

fn explore(
    circuit: &Circuit,
    w: Wire,
    dst: Wire,
    current: &mut Path,
    visited: &mut FxHashSet<NodeId>,
    ret: &mut Vec<Path>,
) {
    for &id in circuit.consumers(w) {
        if !visited.insert(id) {
            continue;
        }
        current.nodes.push(id);
        for &o in circuit.node(id).outputs() {
            current.wires.push(o);
            if o == dst {
                ret.push(current.clone());
            } else {
                explore(circuit, o, dst, current, visited, ret);
            }
            current.wires.pop();
        }
        current.nodes.pop();
        visited.remove(&id);
    }
}

/// Largest summed firing delay over the paths from `src` to `dst`, if there is one
pub fn path_delay(circuit: &Circuit, src: Wire, dst: Wire) -> Option<f64> {
    paths(circuit, src, dst)
        .iter()
        .map(|p| {
            p.wires
                .iter()
                .map(|w| delay(circuit, *w).map(|d| d.max()).unwrap_or(0.0))
                .sum::<f64>()
        })
        .max_by(f64::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{ElementSpec, Overrides, TransitionSpec as T};
    use tracing_test::traced_test;

    #[test]
    fn test_delay() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        let b = circuit.inp_at(&[2.0], Some("b")).unwrap();
        let q = circuit.c_inv(a, b, Some("q")).unwrap();
        assert_eq!(delay(&circuit, q).unwrap(), DelayInfo::Single(9.0));
        let free = circuit.add_wire(Some("free"));
        assert_eq!(
            delay(&circuit, free),
            Err(TopologyError::NoProducer("free".to_string()))
        );
    }

    #[test]
    #[traced_test]
    fn test_multiple_delays() {
        let spec = ElementSpec::new("TWO", &["a"], &["q"])
            .transition(T::new("idle", "a", "armed").fires("q").delay(1.0))
            .transition(T::new("armed", "a", "idle").fires("q").delay(3.0));
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0, 2.0, 3.0], Some("a")).unwrap();
        assert_eq!(
            delay(&circuit, a).unwrap(),
            DelayInfo::Multiple(vec![1.0, 2.0, 3.0])
        );
        let q = circuit.cell(&spec, &Overrides::new(), &[a], &[Some("q")]).unwrap()[0];
        let d = delay(&circuit, q).unwrap();
        assert_eq!(d, DelayInfo::Multiple(vec![1.0, 3.0]));
        assert_eq!(d.max(), 3.0);
        assert!(logs_contain("Wire q is fired with several delays: 1, 3"));
    }

    #[test]
    fn test_paths() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        let (l, r) = circuit.s(a, None, None).unwrap();
        let l = circuit.jtl(l, None).unwrap();
        let l = circuit.jtl(l, None).unwrap();
        let q = circuit.m(l, r, Some("q")).unwrap();
        let found = paths(&circuit, a, q);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.wires.last() == Some(&q)));
        let lengths: Vec<usize> = found.iter().map(|p| p.nodes.len()).sorted().collect();
        assert_eq!(lengths, vec![2, 4]);
        let d = path_delay(&circuit, a, q).unwrap();
        assert!((d - (4.3 + 5.7 + 5.7 + 4.0)).abs() < 1e-9);
        assert_eq!(path_delay(&circuit, q, a), None);
    }

    #[test]
    fn test_paths_cycle() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[0.0], Some("a")).unwrap();
        let loopback = circuit.add_wire(None);
        let q = circuit.m(a, loopback, Some("q")).unwrap();
        let (x, back) = circuit.s(q, Some("x"), None).unwrap();
        circuit.redirect(loopback, back).unwrap();
        let found = paths(&circuit, a, x);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nodes.len(), 2);
        assert_eq!(paths(&circuit, q, q).len(), 1);
    }
}
