use std::fmt;
use std::sync::Arc;

use fxhash::FxHashMap;
use tracing::warn;

use crate::circuit::node::{Node, NodeId};
use crate::circuit::wire::{Wire, WireData, SOURCE_WIRE, TEMPORARY_PREFIX};
use crate::error::{Error, TopologyError};
use crate::fsm::{Element, ElementKind};

/// A circuit of cells connected by wires
///
/// Every wire has at most one producer and at most one consumer, except the global source wire
/// which feeds every input generator. Structural rules are checked when nodes are added, so that
/// a circuit is always valid for simulation.
///
/// ```
/// # use pulsim::Circuit;
/// let mut circuit = Circuit::new();
/// let a = circuit.inp_at(&[1.0, 5.0], Some("a")).unwrap();
/// let q = circuit.jtl(a, Some("q")).unwrap();
/// assert_eq!(circuit.name(q), "q");
/// assert!(circuit.producer(q).is_some());
/// assert_eq!(circuit.nb_nodes(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Circuit {
    wires: Vec<WireData>,
    nodes: Vec<Node>,
    by_name: FxHashMap<String, Wire>,
    producer: Vec<Option<NodeId>>,
    consumers: Vec<Vec<NodeId>>,
    next_temporary: usize,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Create a new circuit, containing only the global source
    pub fn new() -> Circuit {
        let mut ret = Circuit {
            wires: Vec::new(),
            nodes: Vec::new(),
            by_name: FxHashMap::default(),
            producer: Vec::new(),
            consumers: Vec::new(),
            next_temporary: 0,
        };
        let source = ret.add_wire(Some(SOURCE_WIRE));
        let id = NodeId::new(0);
        ret.nodes
            .push(Node::new(id, Arc::new(Element::source()), &[], &[source]));
        ret.producer[source.index()] = Some(id);
        ret
    }

    /// Remove every wire and node, and restart the automatic naming
    pub fn reset(&mut self) {
        *self = Circuit::new();
    }

    /// Return the number of wires
    pub fn nb_wires(&self) -> usize {
        self.wires.len()
    }

    /// Return the number of nodes, including the source
    pub fn nb_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Iterate over all wires
    pub fn wires(&self) -> impl Iterator<Item = Wire> {
        (0..self.nb_wires()).map(Wire::from_index)
    }

    /// All nodes, in creation order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Get a node
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// The global source wire
    pub fn source_wire(&self) -> Wire {
        Wire::from_index(0)
    }

    /// Return whether the wire belongs to this circuit
    pub fn contains(&self, w: Wire) -> bool {
        w.index() < self.nb_wires()
    }

    /// Name of a wire
    pub fn name(&self, w: Wire) -> &str {
        &self.wires[w.index()].name
    }

    /// Alias under which a wire is observed, if it is
    pub fn observed_as(&self, w: Wire) -> Option<&str> {
        self.wires[w.index()].observed_as.as_deref()
    }

    /// Observed wires with their alias
    pub fn observed(&self) -> impl Iterator<Item = (Wire, &str)> {
        self.wires()
            .filter_map(|w| self.observed_as(w).map(|alias| (w, alias)))
    }

    /// Look a wire up by name
    pub fn wire_by_name(&self, name: &str) -> Option<Wire> {
        self.by_name.get(name).copied()
    }

    /// Node driving a wire
    pub fn producer(&self, w: Wire) -> Option<NodeId> {
        self.producer[w.index()]
    }

    /// Nodes fed by a wire; at most one, except for the source wire
    pub fn consumers(&self, w: Wire) -> &[NodeId] {
        &self.consumers[w.index()]
    }

    /// Create a named wire, observed under its name
    ///
    /// If another wire already has this name, it is renamed with an internal name and no longer observed.
    pub fn wire(&mut self, name: &str) -> Wire {
        self.add_wire(Some(name))
    }

    /// Create a wire; unnamed wires get an internal name and are not observed
    pub fn add_wire(&mut self, name: Option<&str>) -> Wire {
        let name = match name {
            Some(n) => n.to_string(),
            None => self.temporary_name(),
        };
        let w = Wire::from_index(self.wires.len());
        self.wires.push(WireData::new(name.clone()));
        self.producer.push(None);
        self.consumers.push(Vec::new());
        self.claim_name(w, name);
        w
    }

    /// Give a new name to a wire; it is observed under that name unless it is an internal one
    pub fn rename(&mut self, w: Wire, name: &str) {
        let old = std::mem::take(&mut self.wires[w.index()].name);
        if self.by_name.get(&old) == Some(&w) {
            self.by_name.remove(&old);
        }
        self.wires[w.index()] = WireData::new(name.to_string());
        self.claim_name(w, name.to_string());
    }

    /// Observe a wire under an alias
    pub fn inspect(&mut self, w: Wire, alias: &str) {
        self.wires[w.index()].observed_as = Some(alias.to_string());
    }

    /// Stop observing a wire
    pub fn ignore(&mut self, w: Wire) {
        self.wires[w.index()].observed_as = None;
    }

    fn temporary_name(&mut self) -> String {
        loop {
            let name = format!("{}{}", TEMPORARY_PREFIX, self.next_temporary);
            self.next_temporary += 1;
            if !self.by_name.contains_key(&name) {
                return name;
            }
        }
    }

    fn claim_name(&mut self, w: Wire, name: String) {
        if let Some(&old) = self.by_name.get(&name) {
            if old != w {
                warn!(
                    "A wire with the name {} already exists and will be given a new internal name",
                    name
                );
                let tmp = self.temporary_name();
                let data = &mut self.wires[old.index()];
                data.name = tmp.clone();
                data.observed_as = None;
                self.by_name.insert(tmp, old);
            }
        }
        self.by_name.insert(name, w);
    }

    /// Bind an element to input and output wires
    pub fn add_node(
        &mut self,
        element: Arc<Element>,
        inputs: &[Wire],
        outputs: &[Wire],
    ) -> Result<NodeId, TopologyError> {
        self.check_node(&element, inputs, outputs)?;
        let id = NodeId::new(self.nodes.len());
        for &w in inputs {
            self.consumers[w.index()].push(id);
        }
        for &w in outputs {
            self.producer[w.index()] = Some(id);
        }
        self.nodes.push(Node::new(id, element, inputs, outputs));
        Ok(id)
    }

    fn check_node(
        &self,
        element: &Element,
        inputs: &[Wire],
        outputs: &[Wire],
    ) -> Result<(), TopologyError> {
        self.check_inputs(element, inputs)?;
        if element.nb_outputs() != outputs.len() {
            return Err(TopologyError::OutputArity {
                element: element.name().to_string(),
                expected: element.nb_outputs(),
                got: outputs.len(),
            });
        }
        if let Some(w) = outputs.iter().find(|w| !self.contains(**w)) {
            return Err(TopologyError::UnknownWire(w.to_string()));
        }
        for (i, w) in outputs.iter().enumerate() {
            if self.producer(*w).is_some() || outputs[..i].contains(w) {
                return Err(TopologyError::AlreadyProduced(self.name(*w).to_string()));
            }
        }
        Ok(())
    }

    /// Check that an element may consume these wires, before any of its outputs is created
    pub(crate) fn check_inputs(
        &self,
        element: &Element,
        inputs: &[Wire],
    ) -> Result<(), TopologyError> {
        if element.nb_inputs() != inputs.len() {
            return Err(TopologyError::InputArity {
                element: element.name().to_string(),
                expected: element.nb_inputs(),
                got: inputs.len(),
            });
        }
        if let Some(w) = inputs.iter().find(|w| !self.contains(**w)) {
            return Err(TopologyError::UnknownWire(w.to_string()));
        }
        let source = self.source_wire();
        for (i, w) in inputs.iter().enumerate() {
            if *w != source && inputs[..i].contains(w) {
                return Err(TopologyError::DuplicateInput(self.name(*w).to_string()));
            }
        }
        for w in inputs {
            if *w != source && !self.consumers(*w).is_empty() {
                return Err(TopologyError::AlreadyConsumed(self.name(*w).to_string()));
            }
        }
        if inputs.contains(&source) && element.kind() != ElementKind::Generator {
            return Err(TopologyError::SourceToNonGenerator(element.name().to_string()));
        }
        Ok(())
    }

    /// Make `target` receive the pulses of `from`, through a zero-delay connection
    ///
    /// This is how feedback loops are closed: `target` may be used as an input before its producer exists.
    pub fn redirect(&mut self, target: Wire, from: Wire) -> Result<NodeId, Error> {
        for w in [target, from] {
            if !self.contains(w) {
                return Err(TopologyError::UnknownWire(w.to_string()).into());
            }
        }
        if self.producer(target).is_some() {
            return Err(TopologyError::AlreadyProduced(self.name(target).to_string()).into());
        }
        if !self.consumers(from).is_empty() {
            return Err(TopologyError::AlreadyConsumed(self.name(from).to_string()).into());
        }
        let connection = Arc::new(crate::cells::connection().build(&Default::default())?);
        Ok(self.add_node(connection, &[from], &[target])?)
    }

    /// Check the consistency of the indices
    pub fn check(&self) {
        for (i, n) in self.nodes.iter().enumerate() {
            assert_eq!(n.id().index(), i, "Node {i} has a wrong id");
            for &w in n.inputs() {
                assert!(self.contains(w), "Invalid input {w} of node {i}");
                assert!(self.consumers(w).contains(&n.id()));
            }
            for &w in n.outputs() {
                assert!(self.contains(w), "Invalid output {w} of node {i}");
                assert_eq!(self.producer(w), Some(n.id()));
            }
        }
        for w in self.wires() {
            if w != self.source_wire() {
                assert!(self.consumers(w).len() <= 1, "Wire {w} has several consumers");
            }
            assert_eq!(self.wire_by_name(self.name(w)), Some(w));
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Circuit with {} wires, {} nodes:",
            self.nb_wires(),
            self.nb_nodes()
        )?;
        for w in self.wires() {
            write!(f, "\t{} = {}", w, self.name(w))?;
            if let Some(alias) = self.observed_as(w) {
                if alias != self.name(w) {
                    write!(f, " (observed as {alias})")?;
                }
            }
            writeln!(f)?;
        }
        for n in &self.nodes {
            writeln!(f, "\t{n}")?;
        }
        Ok(())
    }
}
