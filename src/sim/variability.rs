use std::fmt;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

use crate::circuit::{Circuit, Node, NodeId, Wire};
use crate::fsm::ElementKind;

/// Maximum relative deviation of the default perturbation
pub const MAX_DEVIATION: f64 = 0.2;

/// Perturbation of a delay, given the node firing the pulse
pub type PerturbationFn = Box<dyn FnMut(f64, &Node, &mut SmallRng) -> f64 + Send>;

/// Selection of the nodes or wires subject to variability
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// Nodes of a cell type, by name
    ElementName(String),
    /// Nodes of a kind of element
    Kind(ElementKind),
    /// A single node
    Node(NodeId),
    /// Pulses scheduled on a wire, by name
    WireName(String),
    /// Pulses scheduled on a wire
    Wire(Wire),
}

impl Selector {
    fn matches(&self, circuit: &Circuit, node: &Node, wire: Wire) -> bool {
        match self {
            Selector::ElementName(n) => node.element().name() == n,
            Selector::Kind(k) => node.element().kind() == *k,
            Selector::Node(id) => node.id() == *id,
            Selector::WireName(n) => circuit.name(wire) == n,
            Selector::Wire(w) => wire == *w,
        }
    }
}

/// Default perturbation: normal distribution around the delay, with a standard deviation of
/// a third of the maximum deviation, clamped to that deviation
pub fn default_variability(delay: f64, rng: &mut SmallRng) -> f64 {
    let Ok(normal) = Normal::new(delay, delay * MAX_DEVIATION / 3.0) else {
        return delay;
    };
    let lo = delay * (1.0 - MAX_DEVIATION);
    let hi = delay * (1.0 + MAX_DEVIATION);
    normal.sample(rng).clamp(lo.min(hi), hi.max(lo))
}

/// Stochastic perturbation of the firing delays, applied when pulses are scheduled
///
/// Only the pulses fired by included nodes (all by default) and not excluded are perturbed.
pub struct Variability {
    perturbation: Option<PerturbationFn>,
    include: Vec<Selector>,
    exclude: Vec<Selector>,
    rng: SmallRng,
}

impl fmt::Debug for Variability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variability")
            .field("custom", &self.perturbation.is_some())
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .finish()
    }
}

impl Variability {
    /// Default gaussian perturbation, with a seeded random generator
    pub fn gaussian(seed: u64) -> Variability {
        Variability {
            perturbation: None,
            include: Vec::new(),
            exclude: Vec::new(),
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Custom perturbation function
    pub fn custom<F>(seed: u64, f: F) -> Variability
    where
        F: FnMut(f64, &Node, &mut SmallRng) -> f64 + Send + 'static,
    {
        Variability {
            perturbation: Some(Box::new(f)),
            ..Variability::gaussian(seed)
        }
    }

    /// Only perturb what matches one of the included selectors
    pub fn include(mut self, s: Selector) -> Self {
        self.include.push(s);
        self
    }

    /// Never perturb what matches this selector
    pub fn exclude(mut self, s: Selector) -> Self {
        self.exclude.push(s);
        self
    }

    /// Return whether pulses fired by this node on this wire are perturbed
    pub fn applies_to(&self, circuit: &Circuit, node: &Node, wire: Wire) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|s| s.matches(circuit, node, wire));
        included && !self.exclude.iter().any(|s| s.matches(circuit, node, wire))
    }

    /// Perturb the delay of a pulse fired by a node on a wire
    pub fn apply(&mut self, delay: f64, circuit: &Circuit, node: &Node, wire: Wire) -> f64 {
        if !self.applies_to(circuit, node, wire) {
            return delay;
        }
        match &mut self.perturbation {
            Some(f) => f(delay, node, &mut self.rng),
            None => default_variability(delay, &mut self.rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut distinct = false;
        for _ in 0..10000 {
            let d = default_variability(10.0, &mut rng);
            assert!((8.0..=12.0).contains(&d), "{d} out of bounds");
            distinct |= d != 10.0;
        }
        assert!(distinct);
        assert_eq!(default_variability(0.0, &mut rng), 0.0);
    }

    #[test]
    fn test_selectors() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        let q = circuit.jtl(a, Some("q")).unwrap();
        let input_node = circuit.node(circuit.producer(a).unwrap()).clone();
        let jtl = circuit.node(circuit.producer(q).unwrap()).clone();

        let v = Variability::gaussian(0).exclude(Selector::Kind(ElementKind::Generator));
        assert!(!v.applies_to(&circuit, &input_node, a));
        assert!(v.applies_to(&circuit, &jtl, q));

        let v = Variability::gaussian(0).include(Selector::ElementName("JTL".to_string()));
        assert!(!v.applies_to(&circuit, &input_node, a));
        assert!(v.applies_to(&circuit, &jtl, q));

        let v = Variability::gaussian(0)
            .include(Selector::WireName("q".to_string()))
            .exclude(Selector::Node(jtl.id()));
        assert!(!v.applies_to(&circuit, &jtl, q));

        let mut v = Variability::custom(0, |d, _, _| d * 2.0).include(Selector::Wire(q));
        assert_eq!(v.apply(5.7, &circuit, &jtl, q), 11.4);
        assert_eq!(v.apply(1.0, &circuit, &input_node, a), 1.0);
    }
}
