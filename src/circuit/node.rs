use std::fmt;
use std::sync::Arc;

use crate::circuit::Wire;
use crate::fsm::Element;

/// Identifier of a node, in creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) fn new(ix: usize) -> NodeId {
        NodeId(ix)
    }

    /// Index of the node in its circuit
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// An instance of an [`Element`] bound to concrete wires
///
/// Nodes are immutable: the runtime state of their state machine is kept by the simulator.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    element: Arc<Element>,
    inputs: Box<[Wire]>,
    outputs: Box<[Wire]>,
}

impl Node {
    pub(crate) fn new(
        id: NodeId,
        element: Arc<Element>,
        inputs: &[Wire],
        outputs: &[Wire],
    ) -> Node {
        Node {
            id,
            element,
            inputs: inputs.into(),
            outputs: outputs.into(),
        }
    }

    /// Identifier of the node
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Cell type of the node
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Shared handle to the cell type
    pub fn element_handle(&self) -> Arc<Element> {
        self.element.clone()
    }

    /// Input wires, in port order
    pub fn inputs(&self) -> &[Wire] {
        &self.inputs
    }

    /// Output wires, in port order
    pub fn outputs(&self) -> &[Wire] {
        &self.outputs
    }

    /// Port index of an input wire
    pub fn input_port(&self, w: Wire) -> Option<usize> {
        self.inputs.iter().position(|i| *i == w)
    }

    /// Port index of an output wire
    pub fn output_port(&self, w: Wire) -> Option<usize> {
        self.outputs.iter().position(|o| *o == w)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}(", self.id, self.element.name())?;
        for (i, w) in self.inputs.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{w}")?;
        }
        write!(f, ") -> ")?;
        for (i, w) in self.outputs.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{w}")?;
        }
        Ok(())
    }
}
