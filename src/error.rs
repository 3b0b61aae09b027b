//! Errors raised while specifying cells, building circuits and simulating them
//!
//! There are three tiers, all reported synchronously:
//! * [`SpecError`] when a cell type is declared or instantiated;
//! * [`TopologyError`] when the circuit graph is built;
//! * [`SimError`] (wrapping a [`StepError`]) when a simulation run hits a timing violation.
//!
//! None of them are recoverable: they describe a circuit that is physically invalid.

use thiserror::Error;

/// Malformed cell specification or per-instance override
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    /// A transition lacks one of its mandatory fields
    #[error("The given FSM is missing a '{0}' key in a transition.")]
    MissingField(&'static str),

    /// A trigger is not a declared input
    #[error("Input trigger '{0}' from transitions was not found in list of inputs.")]
    UnknownTrigger(String),

    /// The same trigger is listed twice on one transition
    #[error("Input trigger '{0}' is found multiple times in trigger field.")]
    DuplicateTrigger(String),

    /// A fired output is not a declared output
    #[error("Output '{0}' from transitions was not found in list of outputs.")]
    UnknownOutput(String),

    /// The same output is fired twice on one transition
    #[error("Output '{0}' is found multiple times in firing field.")]
    DuplicateOutput(String),

    /// Per-output firing delays name outputs the transition does not fire
    #[error(
        "The following keys of a firing delay dictionary are not firing outputs for this transition: {0}."
    )]
    DelayForUnfiredOutput(String),

    /// A firing delay is negative or not a number
    #[error("Firing delay must be a non-negative number; got {0}.")]
    InvalidDelay(f64),

    /// A dwell time is negative or not a number
    #[error("Transition time must be a non-negative number; got {0}.")]
    InvalidDwell(f64),

    /// A past constraint names an input that is not declared
    #[error("Past constraint input '{0}' was not found in list of inputs.")]
    UnknownConstraintInput(String),

    /// A past constraint has a negative or non-numeric gap
    #[error("Past constraint on input '{input}' must be a non-negative number; got {value}.")]
    InvalidConstraint {
        /// Constrained input
        input: String,
        /// Offending value
        value: f64,
    },

    /// Transitions from the same source are not declared next to each other
    #[error(
        "All transitions from the same source must be defined consecutively, which isn't the case for transitions from {0}."
    )]
    NonContiguousSource(String),

    /// Two transitions from the same source share a trigger
    #[error("Ambiguous trigger '{trigger}' found on transitions '{first}' and '{second}' from state '{state}'.")]
    AmbiguousTrigger {
        /// Source state
        state: String,
        /// Shared trigger
        trigger: String,
        /// Id of the first transition
        first: String,
        /// Id of the second transition
        second: String,
    },

    /// A state does not handle every input (strict specifications only)
    #[error("No transitions specified for inputs '{inputs}' from state '{state}'.")]
    MissingTransitions {
        /// State missing transitions
        state: String,
        /// Comma-separated unhandled inputs
        inputs: String,
    },

    /// No transition leaves the `idle` state
    #[error("The given FSM does not have an 'idle' source state.")]
    NoIdleState,

    /// Several transitions declare the same id
    #[error("Multiple transitions with the same id '{0}' found.")]
    DuplicateId(String),

    /// The element declares no output
    #[error("There must be at least one output; found none.")]
    NoOutputs,

    /// A declared output is never fired
    #[error("There must be at least one transition that fires output '{0}'.")]
    UnfiredOutput(String),

    /// An erroneous transition id does not exist
    #[error("Error transition id '{0}' does not match any given transition.")]
    UnknownErrorTransition(String),

    /// Priorities are given on some transitions of a state but not on others
    #[error("Priorities from state '{0}' must be given on every transition or on none.")]
    MixedPriorities(String),

    /// Explicit priorities of a state do not form a contiguous sequence
    #[error("Priorities from state '{state}' must form a contiguous ascending sequence; got {priorities}.")]
    NonContiguousPriorities {
        /// State with the bad priorities
        state: String,
        /// The priorities as given
        priorities: String,
    },

    /// Per-instance override with an unknown key
    #[error("Unexpected override key. Got {0}, expected one of: {keys}", keys = OVERRIDE_KEYS.join(","))]
    UnknownOverride(String),

    /// Per-instance override with a value of the wrong type
    #[error("Invalid type for override {key}. Got {got}, expected one of: {expected}.")]
    InvalidOverrideType {
        /// Override key
        key: String,
        /// Type of the value given
        got: &'static str,
        /// Accepted types
        expected: &'static str,
    },

    /// Generator time that is negative or not a number
    #[error("Generator times must be non-negative numbers, given {0}.")]
    InvalidGeneratorTime(f64),

    /// Lookup of a transition id that does not exist
    #[error("Cannot find transition by {id}; available tids are {available}.")]
    UnknownTransition {
        /// Requested id
        id: String,
        /// Comma-separated existing ids
        available: String,
    },
}

/// Keys accepted as per-instance overrides
pub const OVERRIDE_KEYS: [&str; 5] = [
    "jjs",
    "firing_delay",
    "transition_time",
    "error_transitions",
    "past_constraints",
];

/// Invalid circuit construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// Wrong number of input wires for the element
    #[error("{element} expected {expected} inputs, got {got}")]
    InputArity {
        /// Element name
        element: String,
        /// Declared number of inputs
        expected: usize,
        /// Number of wires given
        got: usize,
    },

    /// Wrong number of output wires for the element
    #[error("{element} expected {expected} outputs, got {got}")]
    OutputArity {
        /// Element name
        element: String,
        /// Declared number of outputs
        expected: usize,
        /// Number of wires given
        got: usize,
    },

    /// The same wire appears twice in one node's inputs
    #[error("'{0}' is used in the input list multiple times. Did you want to use a splitter to split '{0}'?")]
    DuplicateInput(String),

    /// The wire already feeds another node
    #[error("'{0}' is already connected to a node. Did you want to use a splitter to split '{0}'?")]
    AlreadyConsumed(String),

    /// The wire is already driven by another node
    #[error("'{0}' is already connected to a node.")]
    AlreadyProduced(String),

    /// The wire does not belong to this circuit
    #[error("'{0}' is not an existing wire.")]
    UnknownWire(String),

    /// The source wire may only feed pulse generators
    #[error("Pseudo-element \"InPad\" can only be connected to \"InGen\" elements, not {0}")]
    SourceToNonGenerator(String),

    /// A helper was given a number of output names that does not match the wires it creates
    #[error("Number of names given ({got}) does not match the number of output wires produced ({expected}).")]
    NameCount {
        /// Number of wires produced
        expected: usize,
        /// Number of names given
        got: usize,
    },
    /// A wire was split into no wire at all
    #[error("Cannot split a wire into {0} wires.")]
    InvalidFanout(usize),

    /// Introspection on a wire that no node drives
    #[error("No delay found for wire named {0} (is it connected to a node?)")]
    NoProducer(String),
}

/// Timing or behavior violation detected while stepping one node
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    /// An input arrived before the minimum dwell time of the ongoing transition
    #[error(
        "Transition time violation. Received input '{input}' at {time} while still transitioning from {source_state} to {destination} on '{trigger}' (transition id '{id}'). The earliest it is legal to transition is at time {earliest}."
    )]
    DwellViolation {
        /// Input received
        input: String,
        /// Time it was received
        time: f64,
        /// Source state of the ongoing transition
        source_state: String,
        /// Destination state of the ongoing transition
        destination: String,
        /// Trigger of the ongoing transition
        trigger: String,
        /// Id of the ongoing transition
        id: String,
        /// Earliest legal time for a new input
        earliest: f64,
    },

    /// An input arrived too soon after a previous input
    #[error(
        "Past constraint violation. Received input '{input}' at {time} (transition id '{id}'), but input '{constrained}' was last seen at {last_seen}, less than the required {constraint} before (short by {shortfall})."
    )]
    PastConstraint {
        /// Input received
        input: String,
        /// Time it was received
        time: f64,
        /// Id of the matched transition
        id: String,
        /// Input the constraint is about
        constrained: String,
        /// Minimum required gap
        constraint: f64,
        /// Last time the constrained input was seen
        last_seen: f64,
        /// Missing time to satisfy the constraint
        shortfall: f64,
    },

    /// No transition handles this input from the current state
    #[error("No matching transition found from state '{state}' on input '{input}'.")]
    NoTransition {
        /// Current state
        state: String,
        /// Input received
        input: String,
    },

    /// An erroneous transition was taken
    #[error("Triggered erroneous transition id '{id}' on input '{input}'")]
    ErrorTransition {
        /// Id of the transition
        id: String,
        /// Input received
        input: String,
    },

    /// A functional element returned the wrong number of outputs
    #[error("Functional element {element} returned {got} outputs, expected {expected}")]
    FunctionalArity {
        /// Element name
        element: String,
        /// Declared number of outputs
        expected: usize,
        /// Number of values returned
        got: usize,
    },
}

/// Fatal error during a simulation run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// A node rejected its inputs
    #[error("Error while sending inputs to the node with output wire '{wire}':\n{source}")]
    Node {
        /// Name of the node's first output wire
        wire: String,
        /// Underlying violation
        source: StepError,
    },
}

/// Any error raised by this crate
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// See [`SpecError`]
    #[error(transparent)]
    Spec(#[from] SpecError),
    /// See [`TopologyError`]
    #[error(transparent)]
    Topology(#[from] TopologyError),
    /// See [`SimError`]
    #[error(transparent)]
    Simulation(#[from] SimError),
}
