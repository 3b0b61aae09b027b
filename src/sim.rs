//! Discrete-event simulation of a circuit
//!
//! Pulses are kept in a time-ordered queue. All pulses sharing a time form an instant, delivered
//! at once: each destination node receives the set of its inputs high at that instant, and
//! handles them in the priority order of its current state. Fired outputs are scheduled after
//! their (possibly perturbed) delay.
//!
//! ```
//! # use pulsim::{Circuit, Simulation};
//! let mut circuit = Circuit::new();
//! let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
//! circuit.jtl_chain(a, 2, &["q"], &Default::default()).unwrap();
//! let mut sim = Simulation::new(&circuit).until(100.0);
//! let events = sim.simulate().unwrap();
//! assert_eq!(events["q"], vec![1.0 + 5.7 + 5.7]);
//! ```

mod dump;
mod queue;
mod variability;

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

use crate::circuit::{Circuit, NodeId, Wire};
use crate::error::SimError;
use crate::fsm::Fsm;

pub use dump::{EdgeDump, NodeDump, PulseDump, StateDump};
pub use queue::{Pulse, PulseQueue};
pub use variability::{default_variability, PerturbationFn, Selector, Variability, MAX_DEVIATION};

/// Pulse times recorded on each observed wire, by alias
pub type Events = BTreeMap<String, Vec<f64>>;

/// Counters collected during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Number of instants processed
    pub instants: usize,
    /// Number of pulses delivered
    pub pulses: usize,
    /// Number of inputs ignored by non-strict cells
    pub unmatched_inputs: usize,
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Simulation:")?;
        writeln!(f, "  Instants: {}", self.instants)?;
        writeln!(f, "  Pulses: {}", self.pulses)?;
        writeln!(f, "  Unmatched inputs: {}", self.unmatched_inputs)
    }
}

/// Simulation of a circuit
///
/// Without a horizon, a circuit with a feedback loop never terminates.
#[derive(Debug)]
pub struct Simulation<'a> {
    circuit: &'a Circuit,
    machines: Vec<Fsm>,
    queue: PulseQueue,
    now: f64,
    until: Option<f64>,
    variability: Option<Variability>,
    events: Events,
    stats: SimStats,
}

impl<'a> Simulation<'a> {
    /// Prepare a simulation of the circuit, seeded with the initial source pulse
    pub fn new(circuit: &'a Circuit) -> Simulation<'a> {
        let mut ret = Simulation {
            circuit,
            machines: circuit.nodes().iter().map(|n| n.element().new_fsm()).collect(),
            queue: PulseQueue::new(),
            now: 0.0,
            until: None,
            variability: None,
            events: Events::new(),
            stats: SimStats::default(),
        };
        ret.reset();
        ret
    }

    /// Stop the simulation after this time; pulses exactly at the horizon are still delivered
    pub fn until(mut self, t: f64) -> Self {
        self.until = Some(t);
        self
    }

    /// Perturb the firing delays
    pub fn variability(mut self, v: Variability) -> Self {
        self.variability = Some(v);
        self
    }

    /// Go back to time 0, with every cell idle and only the source pulse pending
    pub fn reset(&mut self) {
        for m in self.machines.iter_mut() {
            m.reset();
        }
        self.queue.clear();
        self.now = 0.0;
        self.stats = SimStats::default();
        self.events = self
            .circuit
            .observed()
            .map(|(_, alias)| (alias.to_string(), Vec::new()))
            .collect();
        self.queue.push(Pulse {
            time: 0.0,
            wire: self.circuit.source_wire(),
        });
    }

    /// Run the simulation from the start; return the pulse times on every observed wire
    pub fn simulate(&mut self) -> Result<Events, SimError> {
        self.reset();
        while self.step()?.is_some() {}
        debug!(
            "Simulation finished at {} after {} instants",
            self.now, self.stats.instants
        );
        Ok(self.events.clone())
    }

    /// Run every instant up to and including time `t`
    pub fn run_to(&mut self, t: f64) -> Result<(), SimError> {
        while self.next_time().is_some_and(|n| n <= t) {
            self.step()?;
        }
        Ok(())
    }

    /// Time of the next instant to process, if any before the horizon
    pub fn next_time(&self) -> Option<f64> {
        let t = self.queue.peek_time()?;
        match self.until {
            Some(until) if t > until => None,
            _ => Some(t),
        }
    }

    /// Process the next instant; return its time, or `None` if the simulation is over
    pub fn step(&mut self) -> Result<Option<f64>, SimError> {
        if self.next_time().is_none() {
            return Ok(None);
        }
        let Some((time, wires)) = self.queue.pop_instant() else {
            return Ok(None);
        };
        debug_assert!(time >= self.now);
        self.now = time;
        self.stats.instants += 1;
        self.stats.pulses += wires.len();
        trace!("Instant {} with {} pulses", time, wires.len());

        let mut destinations: BTreeMap<NodeId, Vec<usize>> = BTreeMap::new();
        for &w in &wires {
            if let Some(alias) = self.circuit.observed_as(w) {
                self.events.entry(alias.to_string()).or_default().push(time);
            }
            for &id in self.circuit.consumers(w) {
                if let Some(port) = self.circuit.node(id).input_port(w) {
                    destinations.entry(id).or_default().push(port);
                }
            }
        }

        for (id, mut ports) in destinations {
            ports.sort();
            ports.dedup();
            self.deliver(id, &ports, time)?;
        }
        Ok(Some(time))
    }

    fn deliver(&mut self, id: NodeId, ports: &[usize], time: f64) -> Result<(), SimError> {
        let circuit = self.circuit;
        let node = circuit.node(id);
        let machine = &mut self.machines[id.index()];
        let unmatched = machine.unmatched();
        let fired = node
            .element()
            .handle_inputs(machine, ports, time)
            .map_err(|e| SimError::Node {
                wire: node
                    .outputs()
                    .first()
                    .map(|w| circuit.name(*w).to_string())
                    .unwrap_or_else(|| node.element().name().to_string()),
                source: e,
            })?;
        self.stats.unmatched_inputs += machine.unmatched() - unmatched;
        trace!(
            "Node {} ({}) fired {} pulses",
            id,
            node.element().name(),
            fired.len()
        );
        for (output, delay) in fired {
            let wire = node.outputs()[output];
            let delay = match &mut self.variability {
                Some(v) => v.apply(delay, circuit, node, wire),
                None => delay,
            };
            self.queue.push(Pulse {
                time: time + delay,
                wire,
            });
        }
        Ok(())
    }

    /// Current time
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Pulse times recorded so far
    pub fn events(&self) -> &Events {
        &self.events
    }

    /// Runtime state of a node
    pub fn fsm(&self, id: NodeId) -> &Fsm {
        &self.machines[id.index()]
    }

    /// Pending pulses, in delivery order
    pub fn pending(&self) -> Vec<Pulse> {
        self.queue.pending()
    }

    /// Counters of the current run
    pub fn stats(&self) -> SimStats {
        self.stats
    }

    /// Snapshot of the state of every node, the wiring and the pending pulses
    pub fn dump(&self) -> StateDump {
        let c = self.circuit;
        let names = |ws: &[Wire]| -> Vec<String> {
            ws.iter().map(|w| c.name(*w).to_string()).collect()
        };
        StateDump {
            now: self.now,
            nodes: c
                .nodes()
                .iter()
                .map(|n| NodeDump {
                    id: n.id().index(),
                    element: n.element().name().to_string(),
                    state: self.machines[n.id().index()].describe(n.element().table()),
                    inputs: names(n.inputs()),
                    outputs: names(n.outputs()),
                })
                .collect(),
            edges: c
                .wires()
                .map(|w| EdgeDump {
                    wire: c.name(w).to_string(),
                    from: c.producer(w).map(|id| id.index()),
                    to: c.consumers(w).iter().map(|id| id.index()).collect(),
                })
                .collect(),
            pending: self
                .pending()
                .into_iter()
                .map(|p| PulseDump {
                    time: p.time,
                    wire: c.name(p.wire).to_string(),
                })
                .collect(),
        }
    }
}

/// Simulate a circuit, optionally up to a horizon; return the pulse times on every observed wire
pub fn simulate(circuit: &Circuit, until: Option<f64>) -> Result<Events, SimError> {
    let mut sim = Simulation::new(circuit);
    if let Some(t) = until {
        sim = sim.until(t);
    }
    sim.simulate()
}
