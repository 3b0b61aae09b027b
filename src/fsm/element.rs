use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::error::{SpecError, StepError};
use crate::fsm::machine::Fsm;
use crate::fsm::overrides::Overrides;
use crate::fsm::spec::{ElementKind, ElementSpec};
use crate::fsm::table::{Transition, TransitionTable};

/// Behavior of a functional element: which outputs fire, given the inputs high at an instant and its time
pub type FunctionalFn = Arc<dyn Fn(&[bool], f64) -> Vec<bool> + Send + Sync>;

/// A validated cell type, shared by all its instances
///
/// It is immutable once built: the runtime state of each instance lives in an [`Fsm`].
#[derive(Clone)]
pub struct Element {
    name: String,
    kind: ElementKind,
    table: TransitionTable,
    strict: bool,
    jjs: Option<u32>,
    firing_delay: f64,
    transition_time: f64,
    function: Option<(FunctionalFn, Vec<f64>)>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("inputs", &self.inputs())
            .field("outputs", &self.outputs())
            .field("transitions", &self.table.nb_transitions())
            .field("functional", &self.function.is_some())
            .finish()
    }
}

impl Element {
    pub(crate) fn from_table(
        spec: &ElementSpec,
        overrides: &Overrides,
        table: TransitionTable,
    ) -> Element {
        Element {
            name: spec.name.clone(),
            kind: spec.kind,
            table,
            strict: spec.strict,
            jjs: overrides.jjs.or(spec.jjs),
            firing_delay: spec.firing_delay,
            transition_time: spec.transition_time,
            function: None,
        }
    }

    /// The pseudo-element driving the global source wire
    pub fn source() -> Element {
        Element {
            name: "InPad".to_string(),
            kind: ElementKind::Source,
            table: TransitionTable::ports(&[], &["out".to_string()]),
            strict: false,
            jjs: None,
            firing_delay: 0.0,
            transition_time: 0.0,
            function: None,
        }
    }

    /// An element whose behavior is an arbitrary function of its inputs
    ///
    /// The function receives one flag per input, telling whether it is high at this instant,
    /// and must return one flag per output, telling whether it fires.
    /// Every output fires after `firing_delay`.
    pub fn functional<F>(
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
        firing_delay: f64,
        f: F,
    ) -> Result<Element, SpecError>
    where
        F: Fn(&[bool], f64) -> Vec<bool> + Send + Sync + 'static,
    {
        if !(firing_delay.is_finite() && firing_delay >= 0.0) {
            return Err(SpecError::InvalidDelay(firing_delay));
        }
        if outputs.is_empty() {
            return Err(SpecError::NoOutputs);
        }
        let inputs: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        let outputs: Vec<String> = outputs.iter().map(|s| s.to_string()).collect();
        let delays = vec![firing_delay; outputs.len()];
        Ok(Element {
            name: name.to_string(),
            kind: ElementKind::Functional,
            table: TransitionTable::ports(&inputs, &outputs),
            strict: true,
            jjs: None,
            firing_delay,
            transition_time: 0.0,
            function: Some((Arc::new(f), delays)),
        })
    }

    /// Name of the cell type
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kind of element
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Input names
    pub fn inputs(&self) -> &[String] {
        self.table.inputs()
    }

    /// Output names
    pub fn outputs(&self) -> &[String] {
        self.table.outputs()
    }

    /// Number of inputs
    pub fn nb_inputs(&self) -> usize {
        self.inputs().len()
    }

    /// Number of outputs
    pub fn nb_outputs(&self) -> usize {
        self.outputs().len()
    }

    /// Index of an input by name
    pub fn input_index(&self, name: &str) -> Option<usize> {
        self.inputs().iter().position(|i| i == name)
    }

    /// Index of an output by name
    pub fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs().iter().position(|o| o == name)
    }

    /// Normalized transition table
    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Normalized transitions
    pub fn transitions(&self) -> &[Transition] {
        self.table.transitions()
    }

    /// Number of Josephson junctions, if known
    pub fn jjs(&self) -> Option<u32> {
        self.jjs
    }

    /// Whether unmatched inputs are errors
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Default firing delay of the cell type
    pub fn firing_delay(&self) -> f64 {
        self.firing_delay
    }

    /// Default dwell time of the cell type
    pub fn transition_time(&self) -> f64 {
        self.transition_time
    }

    /// Return whether the element is a functional hole
    pub fn is_functional(&self) -> bool {
        self.function.is_some()
    }

    /// Get a transition by id; the first one if it has several triggers
    pub fn transition(&self, id: &str) -> Result<&Transition, SpecError> {
        self.transitions()
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| SpecError::UnknownTransition {
                id: id.to_string(),
                available: self.transitions().iter().map(|t| t.id.as_str()).join(", "),
            })
    }

    /// Delays with which an output fires, over all transitions
    pub fn output_delays(&self, output: usize) -> Vec<f64> {
        if let Some((_, delays)) = &self.function {
            return vec![delays[output]];
        }
        let name = &self.outputs()[output];
        self.transitions()
            .iter()
            .filter_map(|t| t.delays(name))
            .flatten()
            .copied()
            .collect()
    }

    /// Create the runtime state of a new instance
    pub fn new_fsm(&self) -> Fsm {
        Fsm::new(&self.table)
    }

    /// Handle the inputs high at time `now`; return the fired outputs and the delay of each pulse
    pub fn handle_inputs(
        &self,
        fsm: &mut Fsm,
        inputs: &[usize],
        now: f64,
    ) -> Result<Vec<(usize, f64)>, StepError> {
        match &self.function {
            Some((f, delays)) => {
                let mut high = vec![false; self.nb_inputs()];
                for &i in inputs {
                    high[i] = true;
                }
                let fired = f(&high, now);
                if fired.len() != self.nb_outputs() {
                    return Err(StepError::FunctionalArity {
                        element: self.name.clone(),
                        expected: self.nb_outputs(),
                        got: fired.len(),
                    });
                }
                Ok(fired
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| **f)
                    .map(|(o, _)| (o, delays[o]))
                    .collect())
            }
            None => fsm.handle_inputs(&self.table, inputs, now, self.strict),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::TransitionSpec as T;

    #[test]
    fn test_functional() {
        let and = Element::functional("AND", &["a", "b"], &["q"], 2.5, |i, _| vec![i[0] && i[1]])
            .unwrap();
        let mut fsm = and.new_fsm();
        assert_eq!(and.handle_inputs(&mut fsm, &[0], 1.0).unwrap(), vec![]);
        assert_eq!(
            and.handle_inputs(&mut fsm, &[0, 1], 2.0).unwrap(),
            vec![(0, 2.5)]
        );
        assert!(and.is_functional());
        assert_eq!(and.output_delays(0), vec![2.5]);

        let bad = Element::functional("BAD", &["a"], &["q"], 1.0, |_, _| vec![true, true]).unwrap();
        let mut fsm = bad.new_fsm();
        assert_eq!(
            bad.handle_inputs(&mut fsm, &[0], 1.0),
            Err(StepError::FunctionalArity {
                element: "BAD".to_string(),
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn test_transition_lookup() {
        let e = ElementSpec::new("X", &["a"], &["q"])
            .transition(T::new("idle", "a", "idle").id("go").fires("q").delay(3.0))
            .build(&Overrides::new().jjs(2))
            .unwrap();
        assert_eq!(e.transition("go").unwrap().trigger, "a");
        assert_eq!(
            e.transition("stop").unwrap_err().to_string(),
            "Cannot find transition by stop; available tids are go."
        );
        assert_eq!(e.jjs(), Some(2));
        assert_eq!(e.output_delays(0), vec![3.0]);
        assert_eq!(e.input_index("a"), Some(0));
        assert_eq!(e.output_index("r"), None);
    }

    #[test]
    fn test_source() {
        let s = Element::source();
        assert_eq!(s.kind(), ElementKind::Source);
        assert_eq!(s.nb_inputs(), 0);
        assert_eq!(s.nb_outputs(), 1);
        let mut fsm = s.new_fsm();
        assert_eq!(s.handle_inputs(&mut fsm, &[], 0.0).unwrap(), vec![]);
    }
}
