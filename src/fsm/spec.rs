use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::SpecError;
use crate::fsm::element::Element;
use crate::fsm::overrides::Overrides;
use crate::fsm::table::TransitionTable;

/// Wildcard for past constraints, standing for every input not listed explicitly
pub const ANY_INPUT: &str = "*";

/// Delay of the pulses fired by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum FiringDelay {
    /// Same delay for every fired output
    Uniform(f64),
    /// Delay per fired output; missing outputs use the element default
    PerOutput(BTreeMap<String, f64>),
    /// A train of pulses on every fired output, one per delay
    Train(Vec<f64>),
}

/// Minimum dwell time of a transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dwell {
    /// Explicit value
    Fixed(f64),
    /// Use the element's default transition time
    Default,
}

/// Kind of element, used to apply structural rules and variability filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    /// Regular cell described by a transition table
    Cell,
    /// Input pulse generator, fed by the source wire
    Generator,
    /// Pseudo-element driving the source wire
    Source,
    /// Zero-delay passthrough created when redirecting a wire
    Connection,
    /// Arbitrary function of the inputs
    Functional,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Cell => "cell",
            ElementKind::Generator => "generator",
            ElementKind::Source => "source",
            ElementKind::Connection => "connection",
            ElementKind::Functional => "functional",
        };
        write!(f, "{s}")
    }
}

/// Declaration of one transition, before validation
///
/// ```
/// # use pulsim::fsm::TransitionSpec;
/// // From idle, on input a, go to a_arrived and fire q after 8.0
/// let t = TransitionSpec::new("idle", "a", "a_arrived")
///     .id("0")
///     .fires("q")
///     .delay(8.0)
///     .dwell(2.0);
/// assert_eq!(t.triggers, vec!["a".to_string()]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionSpec {
    /// Transition id; assigned automatically if omitted
    pub id: Option<String>,
    /// Source state
    pub source: String,
    /// Destination state
    pub destination: String,
    /// Inputs triggering the transition, in priority order
    pub triggers: Vec<String>,
    /// Explicit priority within the source state (lower is handled first)
    pub priority: Option<usize>,
    /// Minimum time before the next input is legal
    pub transition_time: Option<Dwell>,
    /// Minimum time elapsed since each input was last seen
    pub past_constraints: BTreeMap<String, f64>,
    /// Outputs fired
    pub firing: Vec<String>,
    /// Delay of the fired outputs
    pub firing_delay: Option<FiringDelay>,
    /// Whether taking this transition is an error
    pub error: Option<bool>,
}

impl TransitionSpec {
    /// Create a transition on a single trigger
    pub fn new(source: &str, trigger: &str, destination: &str) -> TransitionSpec {
        TransitionSpec::on(source, &[trigger], destination)
    }

    /// Create a transition taken on any of several triggers
    pub fn on(source: &str, triggers: &[&str], destination: &str) -> TransitionSpec {
        TransitionSpec {
            source: source.to_string(),
            destination: destination.to_string(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Set the id
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Add a fired output
    pub fn fires(mut self, output: &str) -> Self {
        self.firing.push(output.to_string());
        self
    }

    /// Set the delay of all fired outputs
    pub fn delay(mut self, delay: f64) -> Self {
        self.firing_delay = Some(FiringDelay::Uniform(delay));
        self
    }

    /// Set the delay of one fired output
    pub fn delay_for(mut self, output: &str, delay: f64) -> Self {
        let mut delays = match self.firing_delay.take() {
            Some(FiringDelay::PerOutput(m)) => m,
            _ => BTreeMap::new(),
        };
        delays.insert(output.to_string(), delay);
        self.firing_delay = Some(FiringDelay::PerOutput(delays));
        self
    }

    /// Fire a train of pulses on every fired output
    pub fn train(mut self, delays: &[f64]) -> Self {
        self.firing_delay = Some(FiringDelay::Train(delays.to_vec()));
        self
    }

    /// Set an explicit dwell time
    pub fn dwell(mut self, time: f64) -> Self {
        self.transition_time = Some(Dwell::Fixed(time));
        self
    }

    /// Use the element's default dwell time
    pub fn default_dwell(mut self) -> Self {
        self.transition_time = Some(Dwell::Default);
        self
    }

    /// Set an explicit priority
    pub fn priority(mut self, priority: usize) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Require `gap` to have elapsed since `input` was last seen; `"*"` stands for all other inputs
    pub fn past(mut self, input: &str, gap: f64) -> Self {
        self.past_constraints.insert(input.to_string(), gap);
        self
    }

    /// Mark the transition as erroneous
    pub fn error(mut self) -> Self {
        self.error = Some(true);
        self
    }
}

/// Declaration of a cell type: its ports, its transitions and its defaults
///
/// Building it with [`ElementSpec::build`] validates and normalizes the table once.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementSpec {
    /// Name of the cell type
    pub name: String,
    /// Kind of element
    pub kind: ElementKind,
    /// Input names, in port order
    pub inputs: Vec<String>,
    /// Output names, in port order
    pub outputs: Vec<String>,
    /// Transitions, in declaration order
    pub transitions: Vec<TransitionSpec>,
    /// Default firing delay
    pub firing_delay: f64,
    /// Default dwell time, used by transitions marked [`Dwell::Default`]
    pub transition_time: f64,
    /// Ids of the transitions considered erroneous
    pub error_transitions: BTreeSet<String>,
    /// Number of Josephson junctions, if known
    pub jjs: Option<u32>,
    /// Whether every state must handle every input, and unmatched inputs are errors
    pub strict: bool,
}

impl ElementSpec {
    /// Create a new strict cell specification with no transitions
    pub fn new(name: &str, inputs: &[&str], outputs: &[&str]) -> ElementSpec {
        ElementSpec {
            name: name.to_string(),
            kind: ElementKind::Cell,
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            transitions: Vec::new(),
            firing_delay: 0.0,
            transition_time: 0.0,
            error_transitions: BTreeSet::new(),
            jjs: None,
            strict: true,
        }
    }

    /// Add a transition
    pub fn transition(mut self, t: TransitionSpec) -> Self {
        self.transitions.push(t);
        self
    }

    /// Set the default firing delay
    pub fn firing_delay(mut self, delay: f64) -> Self {
        self.firing_delay = delay;
        self
    }

    /// Set the default dwell time
    pub fn transition_time(mut self, time: f64) -> Self {
        self.transition_time = time;
        self
    }

    /// Set the number of Josephson junctions
    pub fn jjs(mut self, jjs: u32) -> Self {
        self.jjs = Some(jjs);
        self
    }

    /// Allow partial specifications: unhandled inputs are ignored with a warning
    pub fn non_strict(mut self) -> Self {
        self.strict = false;
        self
    }

    /// Set the kind of element
    pub fn kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark a transition id as erroneous
    pub fn error_transition(mut self, id: &str) -> Self {
        self.error_transitions.insert(id.to_string());
        self
    }

    /// Validate and normalize the specification, applying per-instance overrides
    pub fn build(&self, overrides: &Overrides) -> Result<Element, SpecError> {
        let table = TransitionTable::normalize(self, overrides)?;
        Ok(Element::from_table(self, overrides, table))
    }
}
