use serde::Serialize;

/// Snapshot of a simulation at an instant, for debugging and visualization tools
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateDump {
    /// Current time
    pub now: f64,
    /// State of every node
    pub nodes: Vec<NodeDump>,
    /// Wiring between nodes
    pub edges: Vec<EdgeDump>,
    /// Pending pulses, in delivery order
    pub pending: Vec<PulseDump>,
}

/// State of one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDump {
    /// Node index
    pub id: usize,
    /// Cell type
    pub element: String,
    /// Current state of its state machine
    pub state: String,
    /// Names of its input wires
    pub inputs: Vec<String>,
    /// Names of its output wires
    pub outputs: Vec<String>,
}

/// A wire and the nodes it connects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeDump {
    /// Wire name
    pub wire: String,
    /// Producing node
    pub from: Option<usize>,
    /// Consuming nodes
    pub to: Vec<usize>,
}

/// A pending pulse
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseDump {
    /// Arrival time
    pub time: f64,
    /// Wire name
    pub wire: String,
}

impl StateDump {
    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
