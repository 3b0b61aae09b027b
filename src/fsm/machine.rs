use tracing::{trace, warn};

use crate::error::StepError;
use crate::fsm::table::{StateId, TransitionTable};

/// Current state of a running cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FsmState {
    /// Resting in a state
    Stable(StateId),
    /// Taking a transition with a non-zero dwell time, started at `start`
    Transitioning {
        /// Time the transition was taken
        start: f64,
        /// Index of the transition in the table
        transition: usize,
    },
}

/// Runtime state of one cell instance: its current state and when each input was last seen
///
/// The transition table is not owned, so that many instances share one
/// [`Element`](super::Element).
#[derive(Debug, Clone, PartialEq)]
pub struct Fsm {
    state: FsmState,
    idle: StateId,
    last_seen: Box<[Option<f64>]>,
    unmatched: usize,
}

impl Fsm {
    /// Create a machine in the initial state of the table
    pub fn new(table: &TransitionTable) -> Fsm {
        Fsm {
            state: FsmState::Stable(table.idle()),
            idle: table.idle(),
            last_seen: vec![None; table.inputs().len()].into_boxed_slice(),
            unmatched: 0,
        }
    }

    /// Go back to the initial state and forget past inputs
    pub fn reset(&mut self) {
        self.state = FsmState::Stable(self.idle);
        self.last_seen.iter_mut().for_each(|t| *t = None);
        self.unmatched = 0;
    }

    /// Current state
    pub fn state(&self) -> FsmState {
        self.state
    }

    /// Last time an input was seen, if ever
    pub fn last_seen(&self, input: usize) -> Option<f64> {
        self.last_seen[input]
    }

    /// Number of inputs ignored because no transition handled them (non-strict cells only)
    pub fn unmatched(&self) -> usize {
        self.unmatched
    }

    /// State used to order simultaneous inputs: the current one, or the destination of the ongoing transition
    pub fn settled_state(&self, table: &TransitionTable) -> StateId {
        match self.state {
            FsmState::Stable(s) => s,
            FsmState::Transitioning { transition, .. } => {
                table.transition(transition).destination_ix
            }
        }
    }

    /// Human-readable description of the current state
    pub fn describe(&self, table: &TransitionTable) -> String {
        match self.state {
            FsmState::Stable(s) => table.state_name(s).to_string(),
            FsmState::Transitioning { start, transition } => {
                let t = table.transition(transition);
                format!(
                    "transitioning from {} to {} since {} (transition id '{}')",
                    t.source, t.destination, start, t.id
                )
            }
        }
    }

    /// Step the machine on one input at time `now`
    ///
    /// Returns the fired outputs with the delay of each pulse.
    pub fn step(
        &mut self,
        table: &TransitionTable,
        input: usize,
        now: f64,
        strict: bool,
    ) -> Result<Vec<(usize, f64)>, StepError> {
        let input_name = || table.inputs()[input].clone();
        let current = match self.state {
            FsmState::Stable(s) => s,
            FsmState::Transitioning { start, transition } => {
                let t = table.transition(transition);
                let earliest = start + t.transition_time;
                if now < earliest {
                    return Err(StepError::DwellViolation {
                        input: input_name(),
                        time: now,
                        source_state: t.source.clone(),
                        destination: t.destination.clone(),
                        trigger: t.trigger.clone(),
                        id: t.id.clone(),
                        earliest,
                    });
                }
                t.destination_ix
            }
        };

        let Some(ix) = table.lookup(current, input) else {
            if strict {
                return Err(StepError::NoTransition {
                    state: table.state_name(current).to_string(),
                    input: input_name(),
                });
            }
            warn!(
                "No transition from state '{}' on input '{}'; staying in current state",
                table.state_name(current),
                table.inputs()[input]
            );
            self.state = FsmState::Stable(current);
            self.unmatched += 1;
            return Ok(Vec::new());
        };
        let t = table.transition(ix);
        if t.is_error {
            return Err(StepError::ErrorTransition {
                id: t.id.clone(),
                input: input_name(),
            });
        }
        for &(constrained, gap) in &t.constraints_ix {
            if let Some(prev) = self.last_seen[constrained] {
                if now - prev < gap {
                    return Err(StepError::PastConstraint {
                        input: input_name(),
                        time: now,
                        id: t.id.clone(),
                        constrained: table.inputs()[constrained].clone(),
                        constraint: gap,
                        last_seen: prev,
                        shortfall: gap - (now - prev),
                    });
                }
            }
        }

        trace!(
            "{} --{}--> {} at {}",
            t.source,
            t.trigger,
            t.destination,
            now
        );
        self.last_seen[input] = Some(now);
        self.state = if t.transition_time > 0.0 {
            FsmState::Transitioning {
                start: now,
                transition: ix,
            }
        } else {
            FsmState::Stable(t.destination_ix)
        };
        Ok(t.firing_ix.clone())
    }

    /// Sort simultaneous inputs in the priority order of the settled state
    ///
    /// Inputs that no transition of the state handles come last, by input index.
    pub fn sort_inputs(&self, table: &TransitionTable, inputs: &mut [usize]) {
        let s = self.settled_state(table);
        inputs.sort_by_key(|&i| (table.rank(s, i), i));
    }

    /// Step the machine on several simultaneous inputs, in priority order
    ///
    /// Fired outputs of every step are accumulated.
    pub fn handle_inputs(
        &mut self,
        table: &TransitionTable,
        inputs: &[usize],
        now: f64,
        strict: bool,
    ) -> Result<Vec<(usize, f64)>, StepError> {
        let mut sorted = inputs.to_vec();
        self.sort_inputs(table, &mut sorted);
        let mut ret = Vec::new();
        for i in sorted {
            ret.extend(self.step(table, i, now, strict)?);
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::{ElementSpec, Overrides, TransitionSpec as T};

    fn table(spec: &ElementSpec) -> TransitionTable {
        TransitionTable::normalize(spec, &Overrides::new()).unwrap()
    }

    fn c() -> TransitionTable {
        table(
            &ElementSpec::new("C", &["a", "b"], &["q"])
                .firing_delay(8.0)
                .transition(T::new("idle", "a", "a_arrived").id("0"))
                .transition(T::new("idle", "b", "b_arrived").id("1"))
                .transition(T::new("a_arrived", "b", "idle").id("2").fires("q").dwell(8.0))
                .transition(T::new("a_arrived", "a", "a_arrived").id("3"))
                .transition(T::new("b_arrived", "a", "idle").id("4").fires("q").dwell(8.0))
                .transition(T::new("b_arrived", "b", "b_arrived").id("5")),
        )
    }

    #[test]
    fn test_step() {
        let t = c();
        let mut fsm = Fsm::new(&t);
        assert_eq!(fsm.step(&t, 0, 1.0, true).unwrap(), vec![]);
        assert_eq!(fsm.describe(&t), "a_arrived");
        assert_eq!(fsm.step(&t, 1, 2.0, true).unwrap(), vec![(0, 8.0)]);
        assert_eq!(
            fsm.state(),
            FsmState::Transitioning {
                start: 2.0,
                transition: 2
            }
        );
        assert_eq!(fsm.last_seen(0), Some(1.0));
        assert_eq!(fsm.last_seen(1), Some(2.0));
        assert_eq!(fsm.step(&t, 0, 10.0, true).unwrap(), vec![]);
        assert_eq!(fsm.describe(&t), "a_arrived");
        fsm.reset();
        assert_eq!(fsm.state(), FsmState::Stable(0));
        assert_eq!(fsm.last_seen(0), None);
    }

    #[test]
    fn test_dwell_violation() {
        let t = c();
        let mut fsm = Fsm::new(&t);
        fsm.step(&t, 0, 1.0, true).unwrap();
        fsm.step(&t, 1, 2.0, true).unwrap();
        let err = fsm.step(&t, 0, 9.5, true).unwrap_err();
        assert_eq!(
            err,
            StepError::DwellViolation {
                input: "a".to_string(),
                time: 9.5,
                source_state: "a_arrived".to_string(),
                destination: "idle".to_string(),
                trigger: "b".to_string(),
                id: "2".to_string(),
                earliest: 10.0,
            }
        );
        assert_eq!(
            err.to_string(),
            "Transition time violation. Received input 'a' at 9.5 while still transitioning from a_arrived to idle on 'b' (transition id '2'). The earliest it is legal to transition is at time 10."
        );
    }

    #[test]
    fn test_past_constraint() {
        let t = table(
            &ElementSpec::new("INV", &["a", "clk"], &["q"])
                .transition(T::new("idle", "a", "a_arrived").id("0"))
                .transition(T::new("idle", "clk", "idle").id("1").fires("q"))
                .transition(T::new("a_arrived", "a", "a_arrived").id("3"))
                .transition(T::new("a_arrived", "clk", "idle").id("2").past("a", 1.2)),
        );
        let mut fsm = Fsm::new(&t);
        fsm.step(&t, 0, 5.0, true).unwrap();
        match fsm.step(&t, 1, 6.0, true).unwrap_err() {
            StepError::PastConstraint {
                input,
                id,
                constrained,
                constraint,
                last_seen,
                shortfall,
                ..
            } => {
                assert_eq!(input, "clk");
                assert_eq!(id, "2");
                assert_eq!(constrained, "a");
                assert_eq!(constraint, 1.2);
                assert_eq!(last_seen, 5.0);
                assert!((shortfall - 0.2).abs() < 1e-9);
            }
            e => panic!("Unexpected error {e}"),
        }

        fsm.reset();
        fsm.step(&t, 0, 5.0, true).unwrap();
        assert!(fsm.step(&t, 1, 6.2, true).is_ok());
    }

    #[test]
    fn test_error_transition() {
        let t = table(
            &ElementSpec::new("E", &["a"], &["q"])
                .transition(T::new("idle", "a", "armed").fires("q"))
                .transition(T::new("armed", "a", "idle").error()),
        );
        let mut fsm = Fsm::new(&t);
        fsm.step(&t, 0, 1.0, true).unwrap();
        assert_eq!(
            fsm.step(&t, 0, 2.0, true),
            Err(StepError::ErrorTransition {
                id: "1".to_string(),
                input: "a".to_string()
            })
        );
    }

    #[test]
    fn test_no_transition() {
        let t = table(
            &ElementSpec::new("P", &["a", "b"], &["q"])
                .non_strict()
                .transition(T::new("idle", "a", "idle").fires("q")),
        );
        let mut fsm = Fsm::new(&t);
        assert_eq!(
            fsm.step(&t, 1, 1.0, true),
            Err(StepError::NoTransition {
                state: "idle".to_string(),
                input: "b".to_string()
            })
        );
        assert_eq!(fsm.step(&t, 1, 1.0, false), Ok(vec![]));
        assert_eq!(fsm.unmatched(), 1);
        assert_eq!(fsm.last_seen(1), None);
    }

    #[test]
    fn test_priority_order() {
        // Exclusive-or: simultaneous inputs cancel out when a is handled first
        let xor = |first: &str, second: &str| {
            ElementSpec::new("XOR", &["a", "b"], &["q"])
                .transition(T::new("idle", first, "one").priority(0))
                .transition(T::new("idle", second, "one").priority(1))
                .transition(T::on("one", &["a", "b"], "idle").fires("q"))
        };
        for (first, second) in [("a", "b"), ("b", "a")] {
            let t = table(&xor(first, second));
            let mut fsm = Fsm::new(&t);
            let mut inputs = vec![1, 0];
            fsm.sort_inputs(&t, &mut inputs);
            let expected = t.inputs().iter().position(|i| i == first).unwrap();
            assert_eq!(inputs[0], expected);
            assert_eq!(fsm.handle_inputs(&t, &[0, 1], 3.0, true).unwrap(), vec![(0, 0.0)]);
            assert_eq!(fsm.state(), FsmState::Stable(0));
        }
    }

    #[test]
    fn test_simultaneous_dwell_violation() {
        // The second input of the instant arrives while the first is still transitioning
        let t = table(
            &ElementSpec::new("D", &["a", "b"], &["q"])
                .transition(T::new("idle", "a", "idle").fires("q").dwell(5.0))
                .transition(T::new("idle", "b", "idle")),
        );
        let mut fsm = Fsm::new(&t);
        let err = fsm.handle_inputs(&t, &[1, 0], 2.0, true).unwrap_err();
        match err {
            StepError::DwellViolation { input, earliest, .. } => {
                assert_eq!(input, "b");
                assert_eq!(earliest, 7.0);
            }
            e => panic!("Unexpected error {e}"),
        }
    }
}
