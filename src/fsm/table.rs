use std::collections::{BTreeMap, BTreeSet};

use fxhash::FxHashMap;
use itertools::Itertools;

use crate::error::SpecError;
use crate::fsm::overrides::{DelayOverride, DwellOverride, Overrides, PastOverride};
use crate::fsm::spec::{Dwell, ElementSpec, FiringDelay, TransitionSpec, ANY_INPUT};

/// Index of a state in a [`TransitionTable`]
pub type StateId = usize;

/// Name of the initial state, which every cell must leave from
pub const IDLE: &str = "idle";

/// A validated transition, with a single trigger and every delay resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Transition id; shared by the transitions expanded from one declaration
    pub id: String,
    /// Source state
    pub source: String,
    /// Destination state
    pub destination: String,
    /// Trigger input
    pub trigger: String,
    /// Priority within the source state; lower is handled first
    pub priority: usize,
    /// Resolved dwell time
    pub transition_time: f64,
    /// Resolved past constraints, with the wildcard expanded
    pub past_constraints: BTreeMap<String, f64>,
    /// Fired outputs and the delays of their pulses, in declaration order
    pub firing: Vec<(String, Vec<f64>)>,
    /// Whether taking this transition is an error
    pub is_error: bool,
    pub(crate) source_ix: StateId,
    pub(crate) destination_ix: StateId,
    pub(crate) trigger_ix: usize,
    pub(crate) constraints_ix: Vec<(usize, f64)>,
    pub(crate) firing_ix: Vec<(usize, f64)>,
}

impl Transition {
    /// Delays of the pulses fired on an output, if it is fired
    pub fn delays(&self, output: &str) -> Option<&[f64]> {
        self.firing
            .iter()
            .find(|(o, _)| o == output)
            .map(|(_, d)| d.as_slice())
    }

    /// Return whether the transition fires any output
    pub fn is_firing(&self) -> bool {
        !self.firing.is_empty()
    }
}

/// Normalized transition table of a cell
///
/// States are interned in order of first appearance. For each state, the transitions
/// leaving it are kept sorted by priority, and the rank of each input in that order
/// is precomputed so that simultaneous inputs are sorted without inspecting the table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionTable {
    inputs: Vec<String>,
    outputs: Vec<String>,
    transitions: Vec<Transition>,
    states: Vec<String>,
    idle: StateId,
    by_state: Vec<Vec<usize>>,
    rank: Vec<Box<[usize]>>,
    lookup: FxHashMap<(StateId, usize), usize>,
}

/// Validate a delay or a time, which must be a non-negative number
fn non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

/// Assign an id to every transition that lacks one: the smallest unused non-negative integer
fn assign_ids(transitions: &[TransitionSpec]) -> Vec<String> {
    let declared: BTreeSet<&str> = transitions.iter().filter_map(|t| t.id.as_deref()).collect();
    let mut next = 0usize;
    transitions
        .iter()
        .map(|t| match &t.id {
            Some(id) => id.clone(),
            None => {
                while declared.contains(next.to_string().as_str()) {
                    next += 1;
                }
                next += 1;
                (next - 1).to_string()
            }
        })
        .collect()
}

/// Check a single declaration against the element's ports
fn check_transition(spec: &ElementSpec, t: &TransitionSpec) -> Result<(), SpecError> {
    if t.source.is_empty() {
        return Err(SpecError::MissingField("source"));
    }
    if t.triggers.is_empty() {
        return Err(SpecError::MissingField("trigger"));
    }
    if t.destination.is_empty() {
        return Err(SpecError::MissingField("dest"));
    }
    for (i, tr) in t.triggers.iter().enumerate() {
        if !spec.inputs.contains(tr) {
            return Err(SpecError::UnknownTrigger(tr.clone()));
        }
        if t.triggers[..i].contains(tr) {
            return Err(SpecError::DuplicateTrigger(tr.clone()));
        }
    }
    for (i, o) in t.firing.iter().enumerate() {
        if !spec.outputs.contains(o) {
            return Err(SpecError::UnknownOutput(o.clone()));
        }
        if t.firing[..i].contains(o) {
            return Err(SpecError::DuplicateOutput(o.clone()));
        }
    }
    if let Some(Dwell::Fixed(d)) = t.transition_time {
        if !non_negative(d) {
            return Err(SpecError::InvalidDwell(d));
        }
    }
    match &t.firing_delay {
        Some(FiringDelay::Uniform(d)) => {
            if !non_negative(*d) {
                return Err(SpecError::InvalidDelay(*d));
            }
        }
        Some(FiringDelay::PerOutput(m)) => {
            if let Some(d) = m.values().find(|d| !non_negative(**d)) {
                return Err(SpecError::InvalidDelay(*d));
            }
            let unfired = m.keys().filter(|k| !t.firing.contains(k)).join(",");
            if !unfired.is_empty() {
                return Err(SpecError::DelayForUnfiredOutput(unfired));
            }
        }
        Some(FiringDelay::Train(v)) => {
            if let Some(d) = v.iter().find(|d| !non_negative(**d)) {
                return Err(SpecError::InvalidDelay(*d));
            }
        }
        None => (),
    }
    for (input, gap) in &t.past_constraints {
        if input != ANY_INPUT && !spec.inputs.contains(input) {
            return Err(SpecError::UnknownConstraintInput(input.clone()));
        }
        if !non_negative(*gap) {
            return Err(SpecError::InvalidConstraint {
                input: input.clone(),
                value: *gap,
            });
        }
    }
    Ok(())
}

/// Check the grouping of transitions by source state
fn check_groups(spec: &ElementSpec, ids: &[String]) -> Result<(), SpecError> {
    let groups = spec
        .transitions
        .iter()
        .enumerate()
        .into_group_map_by(|(_, t)| t.source.as_str());
    for (source, group) in groups.iter().sorted_by_key(|(_, g)| g[0].0) {
        let first = group[0].0;
        let last = group[group.len() - 1].0;
        if last - first + 1 != group.len() {
            return Err(SpecError::NonContiguousSource(source.to_string()));
        }
        for (a, (i, ta)) in group.iter().enumerate() {
            for (j, tb) in &group[a + 1..] {
                if let Some(tr) = ta.triggers.iter().find(|tr| tb.triggers.contains(tr)) {
                    return Err(SpecError::AmbiguousTrigger {
                        state: source.to_string(),
                        trigger: tr.to_string(),
                        first: ids[*i].clone(),
                        second: ids[*j].clone(),
                    });
                }
            }
        }
        let explicit = group.iter().filter(|(_, t)| t.priority.is_some()).count();
        if explicit != 0 && explicit != group.len() {
            return Err(SpecError::MixedPriorities(source.to_string()));
        }
    }
    Ok(())
}

/// Check that every state handles every input
fn check_exhaustive(spec: &ElementSpec) -> Result<(), SpecError> {
    let states = spec
        .transitions
        .iter()
        .flat_map(|t| [t.source.as_str(), t.destination.as_str()])
        .unique();
    for state in states {
        let handled: BTreeSet<&String> = spec
            .transitions
            .iter()
            .filter(|t| t.source == state)
            .flat_map(|t| t.triggers.iter())
            .collect();
        let missing = spec.inputs.iter().filter(|i| !handled.contains(i)).join(",");
        if !missing.is_empty() {
            return Err(SpecError::MissingTransitions {
                state: state.to_string(),
                inputs: missing,
            });
        }
    }
    Ok(())
}

impl TransitionTable {
    /// Validate an element specification and resolve its transitions
    pub fn normalize(spec: &ElementSpec, overrides: &Overrides) -> Result<Self, SpecError> {
        if !non_negative(spec.firing_delay) {
            return Err(SpecError::InvalidDelay(spec.firing_delay));
        }
        if !non_negative(spec.transition_time) {
            return Err(SpecError::InvalidDwell(spec.transition_time));
        }
        let ids = assign_ids(&spec.transitions);
        for t in &spec.transitions {
            check_transition(spec, t)?;
        }
        check_groups(spec, &ids)?;
        if spec.strict {
            check_exhaustive(spec)?;
        }
        if !spec.transitions.iter().any(|t| t.source == IDLE) {
            return Err(SpecError::NoIdleState);
        }
        if let Some(dup) = ids.iter().duplicates().next() {
            return Err(SpecError::DuplicateId(dup.clone()));
        }
        if spec.outputs.is_empty() {
            return Err(SpecError::NoOutputs);
        }
        for o in &spec.outputs {
            if !spec.transitions.iter().any(|t| t.firing.contains(o)) {
                return Err(SpecError::UnfiredOutput(o.clone()));
            }
        }
        let error_ids = overrides
            .error_transitions
            .as_ref()
            .unwrap_or(&spec.error_transitions);
        if let Some(unknown) = error_ids.iter().find(|id| !ids.contains(id)) {
            return Err(SpecError::UnknownErrorTransition(unknown.clone()));
        }
        check_overrides(spec, overrides)?;

        let mut table = TransitionTable {
            inputs: spec.inputs.clone(),
            outputs: spec.outputs.clone(),
            ..Default::default()
        };
        for t in &spec.transitions {
            table.intern(&t.source);
            table.intern(&t.destination);
        }
        table.idle = table.state_id(IDLE).unwrap_or_default();

        let mut next_priority: FxHashMap<&str, usize> = FxHashMap::default();
        for (t, id) in spec.transitions.iter().zip(ids.iter()) {
            let transition_time = resolve_dwell(spec, overrides, t, id);
            let past = resolve_constraints(spec, overrides, t, id);
            let firing = resolve_firing(spec, overrides, t);
            let is_error = t.error.unwrap_or_else(|| error_ids.contains(id));
            for trigger in &t.triggers {
                let priority = match t.priority {
                    Some(p) => {
                        let k = t.triggers.iter().position(|x| x == trigger).unwrap_or(0);
                        p + k
                    }
                    None => {
                        let p = next_priority.entry(t.source.as_str()).or_insert(0);
                        *p += 1;
                        *p - 1
                    }
                };
                table.push(Transition {
                    id: id.clone(),
                    source: t.source.clone(),
                    destination: t.destination.clone(),
                    trigger: trigger.clone(),
                    priority,
                    transition_time,
                    past_constraints: past.clone(),
                    firing: firing.clone(),
                    is_error,
                    source_ix: 0,
                    destination_ix: 0,
                    trigger_ix: 0,
                    constraints_ix: Vec::new(),
                    firing_ix: Vec::new(),
                });
            }
        }
        table.check_priorities()?;
        table.index();
        Ok(table)
    }

    /// Table with ports but no transition, for elements that do not run a state machine
    pub(crate) fn ports(inputs: &[String], outputs: &[String]) -> Self {
        let mut table = TransitionTable {
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            ..Default::default()
        };
        table.intern(IDLE);
        table.index();
        table
    }

    fn intern(&mut self, state: &str) -> StateId {
        match self.state_id(state) {
            Some(s) => s,
            None => {
                self.states.push(state.to_string());
                self.states.len() - 1
            }
        }
    }

    fn push(&mut self, mut t: Transition) {
        t.source_ix = self.intern(&t.source);
        t.destination_ix = self.intern(&t.destination);
        t.trigger_ix = self.input_index(&t.trigger);
        t.constraints_ix = t
            .past_constraints
            .iter()
            .map(|(i, gap)| (self.input_index(i), *gap))
            .collect();
        t.firing_ix = t
            .firing
            .iter()
            .flat_map(|(o, delays)| {
                let ix = self.output_index(o);
                delays.iter().map(move |d| (ix, *d))
            })
            .collect();
        self.transitions.push(t);
    }

    fn input_index(&self, name: &str) -> usize {
        self.inputs.iter().position(|i| i == name).unwrap_or(0)
    }

    fn output_index(&self, name: &str) -> usize {
        self.outputs.iter().position(|o| o == name).unwrap_or(0)
    }

    /// Explicit priorities of a state must be consecutive integers
    fn check_priorities(&self) -> Result<(), SpecError> {
        for (state, group) in &self
            .transitions
            .iter()
            .group_by(|t| t.source_ix)
        {
            let sorted: Vec<usize> = group.map(|t| t.priority).sorted().collect();
            if sorted.first() != Some(&0) || sorted.windows(2).any(|w| w[1] != w[0] + 1) {
                return Err(SpecError::NonContiguousPriorities {
                    state: self.states[state].clone(),
                    priorities: format!("[{}]", sorted.iter().join(", ")),
                });
            }
        }
        Ok(())
    }

    /// Build the lookup structures used when stepping
    fn index(&mut self) {
        let nb_states = self.states.len();
        self.by_state = vec![Vec::new(); nb_states];
        for (i, t) in self.transitions.iter().enumerate() {
            self.by_state[t.source_ix].push(i);
            self.lookup.insert((t.source_ix, t.trigger_ix), i);
        }
        for order in self.by_state.iter_mut() {
            order.sort_by_key(|&i| self.transitions[i].priority);
        }
        self.rank = self
            .by_state
            .iter()
            .map(|order| {
                let mut rank = vec![usize::MAX; self.inputs.len()];
                for (r, &i) in order.iter().enumerate() {
                    rank[self.transitions[i].trigger_ix] = r;
                }
                rank.into_boxed_slice()
            })
            .collect();
    }

    /// Input names
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    /// Output names
    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// All normalized transitions, in declaration order
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Get a transition by index
    pub fn transition(&self, i: usize) -> &Transition {
        &self.transitions[i]
    }

    /// Number of normalized transitions
    pub fn nb_transitions(&self) -> usize {
        self.transitions.len()
    }

    /// State names
    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// Name of a state
    pub fn state_name(&self, s: StateId) -> &str {
        &self.states[s]
    }

    /// Index of a state by name
    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.states.iter().position(|s| s == name)
    }

    /// Initial state
    pub fn idle(&self) -> StateId {
        self.idle
    }

    /// Transitions leaving a state, in priority order
    pub fn from_state(&self, s: StateId) -> impl Iterator<Item = &Transition> + '_ {
        self.by_state[s].iter().map(|&i| &self.transitions[i])
    }

    /// Index of the transition taken from a state on an input, if any
    pub fn lookup(&self, s: StateId, input: usize) -> Option<usize> {
        self.lookup.get(&(s, input)).copied()
    }

    /// Rank of an input in the priority order of a state; unhandled inputs rank last
    pub fn rank(&self, s: StateId, input: usize) -> usize {
        self.rank
            .get(s)
            .and_then(|r| r.get(input))
            .copied()
            .unwrap_or(usize::MAX)
    }
}

fn check_overrides(spec: &ElementSpec, overrides: &Overrides) -> Result<(), SpecError> {
    match &overrides.firing_delay {
        Some(DelayOverride::Uniform(d)) if !non_negative(*d) => {
            return Err(SpecError::InvalidDelay(*d))
        }
        Some(DelayOverride::PerOutput(m)) => {
            if let Some(d) = m.values().find(|d| !non_negative(**d)) {
                return Err(SpecError::InvalidDelay(*d));
            }
            if let Some(o) = m.keys().find(|o| !spec.outputs.contains(o)) {
                return Err(SpecError::UnknownOutput(o.clone()));
            }
        }
        _ => (),
    }
    match &overrides.transition_time {
        Some(DwellOverride::Uniform(d)) if !non_negative(*d) => {
            return Err(SpecError::InvalidDwell(*d))
        }
        Some(DwellOverride::PerTransition(m)) => {
            if let Some(d) = m.values().find(|d| !non_negative(**d)) {
                return Err(SpecError::InvalidDwell(*d));
            }
        }
        _ => (),
    }
    match &overrides.past_constraints {
        Some(PastOverride::Uniform(d)) if !non_negative(*d) => {
            return Err(SpecError::InvalidConstraint {
                input: ANY_INPUT.to_string(),
                value: *d,
            })
        }
        Some(PastOverride::PerTransition(m)) => {
            for (input, gap) in m.values().flatten() {
                if input != ANY_INPUT && !spec.inputs.contains(input) {
                    return Err(SpecError::UnknownConstraintInput(input.clone()));
                }
                if !non_negative(*gap) {
                    return Err(SpecError::InvalidConstraint {
                        input: input.clone(),
                        value: *gap,
                    });
                }
            }
        }
        _ => (),
    }
    Ok(())
}

/// Dwell time: instance override, explicit value, element default, then zero
///
/// A uniform override only replaces the element default, never an explicit dwell.
fn resolve_dwell(spec: &ElementSpec, overrides: &Overrides, t: &TransitionSpec, id: &str) -> f64 {
    match (&overrides.transition_time, t.transition_time) {
        (Some(DwellOverride::PerTransition(m)), _) if m.contains_key(id) => m[id],
        (Some(DwellOverride::Uniform(d)), Some(Dwell::Default)) => *d,
        (_, Some(Dwell::Fixed(d))) => d,
        (_, Some(Dwell::Default)) => spec.transition_time,
        (_, None) => 0.0,
    }
}

/// Past constraints, with the wildcard expanded to every input not listed explicitly
fn resolve_constraints(
    spec: &ElementSpec,
    overrides: &Overrides,
    t: &TransitionSpec,
    id: &str,
) -> BTreeMap<String, f64> {
    let declared = match &overrides.past_constraints {
        Some(PastOverride::PerTransition(m)) if m.contains_key(id) => &m[id],
        _ => &t.past_constraints,
    };
    let mut ret = BTreeMap::new();
    for (input, gap) in declared {
        if input != ANY_INPUT {
            ret.insert(input.clone(), *gap);
        }
    }
    if let Some(gap) = declared.get(ANY_INPUT) {
        for input in &spec.inputs {
            ret.entry(input.clone()).or_insert(*gap);
        }
    }
    if let Some(PastOverride::Uniform(gap)) = &overrides.past_constraints {
        for v in ret.values_mut() {
            *v = *gap;
        }
    }
    ret
}

/// Firing delays: instance override, per-output delay, transition delay, element default
fn resolve_firing(
    spec: &ElementSpec,
    overrides: &Overrides,
    t: &TransitionSpec,
) -> Vec<(String, Vec<f64>)> {
    t.firing
        .iter()
        .map(|o| {
            let delays = match (&overrides.firing_delay, &t.firing_delay) {
                (Some(DelayOverride::Uniform(d)), _) => vec![*d],
                (Some(DelayOverride::PerOutput(m)), _) => {
                    vec![m.get(o).copied().unwrap_or(spec.firing_delay)]
                }
                (None, Some(FiringDelay::Uniform(d))) => vec![*d],
                (None, Some(FiringDelay::PerOutput(m))) => {
                    vec![m.get(o).copied().unwrap_or(spec.firing_delay)]
                }
                (None, Some(FiringDelay::Train(v))) => v.clone(),
                (None, None) => vec![spec.firing_delay],
            };
            (o.clone(), delays)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::TransitionSpec as T;

    fn c_spec() -> ElementSpec {
        ElementSpec::new("C", &["a", "b"], &["q"])
            .firing_delay(8.0)
            .transition(T::new("idle", "a", "a_arrived"))
            .transition(T::new("idle", "b", "b_arrived"))
            .transition(T::new("a_arrived", "b", "idle").fires("q").dwell(8.0))
            .transition(T::new("a_arrived", "a", "a_arrived"))
            .transition(T::new("b_arrived", "a", "idle").fires("q").dwell(8.0))
            .transition(T::new("b_arrived", "b", "b_arrived"))
    }

    #[test]
    fn test_normalize() {
        let table = TransitionTable::normalize(&c_spec(), &Overrides::new()).unwrap();
        assert_eq!(table.nb_transitions(), 6);
        assert_eq!(table.states(), &["idle", "a_arrived", "b_arrived"]);
        assert_eq!(table.idle(), 0);
        let ids: Vec<&str> = table.transitions().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5"]);
        let t = table.transition(2);
        assert_eq!(t.transition_time, 8.0);
        assert_eq!(t.delays("q"), Some(&[8.0][..]));
        assert_eq!(table.transition(0).transition_time, 0.0);
        assert!(!table.transition(0).is_firing());
    }

    #[test]
    fn test_auto_ids() {
        let spec = ElementSpec::new("X", &["a"], &["q"])
            .transition(T::new("idle", "a", "s1").id("1"))
            .transition(T::new("s1", "a", "s2"))
            .transition(T::new("s2", "a", "idle").fires("q"));
        let table = TransitionTable::normalize(&spec, &Overrides::new()).unwrap();
        let ids: Vec<&str> = table.transitions().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "0", "2"]);
    }

    #[test]
    fn test_multi_trigger() {
        let spec = ElementSpec::new("M", &["a", "b"], &["q"])
            .transition(T::on("idle", &["b", "a"], "idle").fires("q"));
        let table = TransitionTable::normalize(&spec, &Overrides::new()).unwrap();
        assert_eq!(table.nb_transitions(), 2);
        assert_eq!(table.transition(0).id, table.transition(1).id);
        assert_eq!(table.transition(0).trigger, "b");
        assert_eq!(table.rank(0, 1), 0);
        assert_eq!(table.rank(0, 0), 1);
    }

    #[test]
    fn test_explicit_priorities() {
        let spec = ElementSpec::new("P", &["a", "b"], &["q"])
            .transition(T::new("idle", "a", "idle").priority(1).fires("q"))
            .transition(T::new("idle", "b", "idle").priority(0));
        let table = TransitionTable::normalize(&spec, &Overrides::new()).unwrap();
        let order: Vec<&str> = table.from_state(0).map(|t| t.trigger.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);

        let gap = ElementSpec::new("P", &["a", "b"], &["q"])
            .transition(T::new("idle", "a", "idle").priority(0).fires("q"))
            .transition(T::new("idle", "b", "idle").priority(2));
        assert!(matches!(
            TransitionTable::normalize(&gap, &Overrides::new()),
            Err(SpecError::NonContiguousPriorities { .. })
        ));

        let offset = ElementSpec::new("P", &["a", "b"], &["q"])
            .transition(T::new("idle", "a", "idle").priority(1).fires("q"))
            .transition(T::new("idle", "b", "idle").priority(2));
        assert_eq!(
            TransitionTable::normalize(&offset, &Overrides::new()),
            Err(SpecError::NonContiguousPriorities {
                state: "idle".to_string(),
                priorities: "[1, 2]".to_string(),
            })
        );

        let mixed = ElementSpec::new("P", &["a", "b"], &["q"])
            .transition(T::new("idle", "a", "idle").priority(0).fires("q"))
            .transition(T::new("idle", "b", "idle"));
        assert_eq!(
            TransitionTable::normalize(&mixed, &Overrides::new()),
            Err(SpecError::MixedPriorities("idle".to_string()))
        );
    }

    #[test]
    fn test_validation_errors() {
        let o = Overrides::new();
        let base = || ElementSpec::new("X", &["a"], &["q"]);

        let spec = base().transition(T::new("idle", "z", "idle").fires("q"));
        assert_eq!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::UnknownTrigger("z".to_string()))
        );

        let spec = base().transition(T::new("idle", "a", "idle").fires("r"));
        assert_eq!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::UnknownOutput("r".to_string()))
        );

        let spec = base().transition(T::new("idle", "a", "idle"));
        assert_eq!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::UnfiredOutput("q".to_string()))
        );

        let spec = base().transition(T::new("start", "a", "start").fires("q"));
        assert_eq!(TransitionTable::normalize(&spec, &o), Err(SpecError::NoIdleState));

        let spec = base()
            .transition(T::new("idle", "a", "s1").fires("q"))
            .transition(T::new("s1", "a", "idle"))
            .transition(T::new("idle", "a", "idle"));
        assert_eq!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::NonContiguousSource("idle".to_string()))
        );

        let spec = base()
            .transition(T::new("idle", "a", "idle").fires("q"))
            .transition(T::new("idle", "a", "idle"));
        assert!(matches!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::AmbiguousTrigger { .. })
        ));

        let spec = base().transition(T::new("idle", "a", "idle").fires("q").delay(-1.0));
        assert_eq!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::InvalidDelay(-1.0))
        );

        let spec = base().transition(T::new("idle", "a", "idle").fires("q").dwell(-2.0));
        assert_eq!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::InvalidDwell(-2.0))
        );

        let spec = base()
            .transition(T::new("idle", "a", "idle").fires("q").id("x"))
            .error_transition("y");
        assert_eq!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::UnknownErrorTransition("y".to_string()))
        );

        let spec = base().transition(T::new("idle", "a", "idle").fires("q").past("c", 1.0));
        assert_eq!(
            TransitionTable::normalize(&spec, &o),
            Err(SpecError::UnknownConstraintInput("c".to_string()))
        );
    }

    #[test]
    fn test_invalid_defaults() {
        let o = Overrides::new();
        let base = || {
            ElementSpec::new("X", &["a"], &["q"])
                .transition(T::new("idle", "a", "idle").fires("q").default_dwell())
        };
        assert_eq!(
            TransitionTable::normalize(&base().firing_delay(-3.0), &o),
            Err(SpecError::InvalidDelay(-3.0))
        );
        assert!(matches!(
            TransitionTable::normalize(&base().firing_delay(f64::INFINITY), &o),
            Err(SpecError::InvalidDelay(_))
        ));
        assert_eq!(
            TransitionTable::normalize(&base().transition_time(-1.0), &o),
            Err(SpecError::InvalidDwell(-1.0))
        );
        assert!(matches!(
            TransitionTable::normalize(&base().transition_time(f64::NAN), &o),
            Err(SpecError::InvalidDwell(_))
        ));
        assert!(base().firing_delay(-3.0).build(&o).is_err());
        assert!(TransitionTable::normalize(&base().firing_delay(0.0), &o).is_ok());
    }

    #[test]
    fn test_duplicate_id() {
        let spec = ElementSpec::new("X", &["a"], &["q"])
            .transition(T::new("idle", "a", "s1").id("t").fires("q"))
            .transition(T::new("s1", "a", "idle").id("t"));
        assert_eq!(
            TransitionTable::normalize(&spec, &Overrides::new()),
            Err(SpecError::DuplicateId("t".to_string()))
        );
    }

    #[test]
    fn test_exhaustive() {
        let spec = ElementSpec::new("X", &["a", "b"], &["q"])
            .transition(T::new("idle", "a", "idle").fires("q"));
        let err = TransitionTable::normalize(&spec, &Overrides::new()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "No transitions specified for inputs 'b' from state 'idle'."
        );
        assert!(TransitionTable::normalize(&spec.non_strict(), &Overrides::new()).is_ok());
    }

    #[test]
    fn test_resolution() {
        let spec = ElementSpec::new("X", &["a", "b"], &["q", "r"])
            .firing_delay(3.0)
            .transition_time(4.0)
            .transition(
                T::new("idle", "a", "idle")
                    .fires("q")
                    .fires("r")
                    .delay_for("q", 1.0)
                    .default_dwell()
                    .past("b", 2.0)
                    .past("*", 0.5),
            )
            .transition(T::new("idle", "b", "idle").dwell(1.0));
        let table = TransitionTable::normalize(&spec, &Overrides::new()).unwrap();
        let t = table.transition(0);
        assert_eq!(t.delays("q"), Some(&[1.0][..]));
        assert_eq!(t.delays("r"), Some(&[3.0][..]));
        assert_eq!(t.transition_time, 4.0);
        assert_eq!(t.past_constraints["a"], 0.5);
        assert_eq!(t.past_constraints["b"], 2.0);

        let o = Overrides::new()
            .firing_delay(7.0)
            .transition_time(9.0)
            .past_constraints(0.0);
        let table = TransitionTable::normalize(&spec, &o).unwrap();
        let t = table.transition(0);
        assert_eq!(t.delays("q"), Some(&[7.0][..]));
        assert_eq!(t.delays("r"), Some(&[7.0][..]));
        assert_eq!(t.transition_time, 9.0);
        assert_eq!(table.transition(1).transition_time, 1.0);
        assert!(t.past_constraints.values().all(|g| *g == 0.0));

        let o = Overrides::new().transition_time_for("1", 2.5);
        let table = TransitionTable::normalize(&spec, &o).unwrap();
        assert_eq!(table.transition(0).transition_time, 4.0);
        assert_eq!(table.transition(1).transition_time, 2.5);
    }

    #[test]
    fn test_error_transitions() {
        let spec = ElementSpec::new("X", &["a"], &["q"])
            .transition(T::new("idle", "a", "s1").fires("q"))
            .transition(T::new("s1", "a", "idle"))
            .error_transition("1");
        let table = TransitionTable::normalize(&spec, &Overrides::new()).unwrap();
        assert!(!table.transition(0).is_error);
        assert!(table.transition(1).is_error);

        let o = Overrides::new().error_transitions(&["0"]);
        let table = TransitionTable::normalize(&spec, &o).unwrap();
        assert!(table.transition(0).is_error);
        assert!(!table.transition(1).is_error);
    }
}
