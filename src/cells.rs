//! Library of superconducting cells, and helpers to instantiate them in a circuit
//!
//! Each cell type is available as an [`ElementSpec`] (`jtl()`, `c()`, ...) and as a
//! [`Circuit`] method that instantiates it and returns its output wires.
//!
//! ```
//! # use pulsim::{Circuit, simulate};
//! let mut circuit = Circuit::new();
//! let a = circuit.inp_at(&[2.0], Some("a")).unwrap();
//! let b = circuit.inp_at(&[5.0], Some("b")).unwrap();
//! circuit.c(a, b, Some("q")).unwrap();
//! let events = simulate(&circuit, None).unwrap();
//! assert_eq!(events["q"], vec![13.0]);
//! ```

use std::sync::Arc;

use crate::circuit::{Circuit, Wire};
use crate::error::{Error, SpecError, TopologyError};
use crate::fsm::{Element, ElementKind, ElementSpec, Overrides, TransitionSpec as T};

/// Josephson transmission line: repeats its input
pub fn jtl() -> ElementSpec {
    ElementSpec::new("JTL", &["a"], &["q"])
        .transition(T::new("idle", "a", "idle").fires("q"))
        .firing_delay(5.7)
        .jjs(2)
}

/// Coincidence junction: fires once both inputs have arrived
pub fn c() -> ElementSpec {
    ElementSpec::new("C", &["a", "b"], &["q"])
        .transition(T::new("idle", "a", "a_arrived").id("0"))
        .transition(T::new("idle", "b", "b_arrived").id("1"))
        .transition(T::new("a_arrived", "a", "a_arrived").id("2"))
        .transition(T::new("a_arrived", "b", "idle").id("3").fires("q").dwell(8.0))
        .transition(T::new("b_arrived", "b", "b_arrived").id("4"))
        .transition(T::new("b_arrived", "a", "idle").id("5").fires("q").dwell(8.0))
        .firing_delay(8.0)
        .jjs(5)
}

/// Inverted coincidence junction: fires on the first input, then waits for the other one
pub fn c_inv() -> ElementSpec {
    ElementSpec::new("C_INV", &["a", "b"], &["q"])
        .transition(T::new("idle", "a", "a_arrived").id("0").fires("q"))
        .transition(T::new("idle", "b", "b_arrived").id("1").fires("q"))
        .transition(T::new("a_arrived", "a", "a_arrived").id("2"))
        .transition(T::new("a_arrived", "b", "idle").id("3").dwell(9.0))
        .transition(T::new("b_arrived", "b", "b_arrived").id("4"))
        .transition(T::new("b_arrived", "a", "idle").id("5").dwell(9.0))
        .firing_delay(9.0)
        .jjs(3)
}

/// Merger: fires on either input
pub fn m() -> ElementSpec {
    ElementSpec::new("M", &["a", "b"], &["q"])
        .transition(T::new("idle", "a", "idle").fires("q").default_dwell())
        .transition(T::new("idle", "b", "idle").fires("q").default_dwell())
        .firing_delay(4.0)
        .jjs(5)
}

/// Splitter: duplicates its input
pub fn s() -> ElementSpec {
    ElementSpec::new("S", &["a"], &["l", "r"])
        .transition(T::new("idle", "a", "idle").fires("l").fires("r"))
        .firing_delay(4.3)
        .jjs(3)
}

/// Destructive read-out: stores a pulse, released by the clock
pub fn dro() -> ElementSpec {
    ElementSpec::new("DRO", &["a", "clk"], &["q"])
        .transition(T::new("idle", "a", "a_arrived").id("0").dwell(2.3))
        .transition(T::new("idle", "clk", "idle").id("1").dwell(5.1))
        .transition(T::new("a_arrived", "a", "a_arrived").id("2"))
        .transition(T::new("a_arrived", "clk", "idle").id("3").fires("q").dwell(5.1))
        .firing_delay(5.1)
        .jjs(6)
}

/// Dual-rail 2x2 join: fires the output matching the values of both dual-rail inputs
///
/// Receiving the same operand twice is an erroneous transition.
pub fn two_by_two_join() -> ElementSpec {
    let mut ret = ElementSpec::new(
        "TWOBYTWOJOIN",
        &["a_t", "a_f", "b_t", "b_f"],
        &["q00", "q01", "q10", "q11"],
    )
    .firing_delay(2.0)
    .jjs(0);
    for i in ["a_f", "a_t", "b_f", "b_t"] {
        ret = ret.transition(T::new("idle", i, &format!("{i}_arrived")));
    }
    let groups = [
        ("a_f", [("b_f", "q00"), ("b_t", "q01")], ["a_f", "a_t"]),
        ("a_t", [("b_f", "q10"), ("b_t", "q11")], ["a_t", "a_f"]),
        ("b_f", [("a_f", "q00"), ("a_t", "q10")], ["b_f", "b_t"]),
        ("b_t", [("a_f", "q01"), ("a_t", "q11")], ["b_f", "b_t"]),
    ];
    for (first, completions, repeats) in groups {
        let state = format!("{first}_arrived");
        for (i, o) in completions {
            ret = ret.transition(T::new(&state, i, "idle").fires(o));
        }
        for i in repeats {
            ret = ret.transition(T::new(&state, i, &state).error());
        }
    }
    ret
}

/// Input generator: fires its output at the given times once the global source pulses
pub fn generator(times: &[f64]) -> Result<ElementSpec, SpecError> {
    if let Some(t) = times.iter().find(|t| !(t.is_finite() && **t >= 0.0)) {
        return Err(SpecError::InvalidGeneratorTime(*t));
    }
    Ok(ElementSpec::new("InGen", &["a"], &["q"])
        .kind(ElementKind::Generator)
        .transition(T::new("idle", "a", "idle").fires("q").train(times)))
}

/// Zero-delay passthrough, used to redirect wires
pub fn connection() -> ElementSpec {
    ElementSpec::new("Connection", &["a"], &["q"])
        .kind(ElementKind::Connection)
        .transition(T::new("idle", "a", "idle").fires("q"))
}

impl Circuit {
    /// Create an input wire with pulses at the given times
    pub fn inp_at(&mut self, times: &[f64], name: Option<&str>) -> Result<Wire, Error> {
        let element = Arc::new(generator(times)?.build(&Overrides::new())?);
        let source = self.source_wire();
        self.check_inputs(&element, &[source])?;
        let out = self.add_wire(name);
        self.add_node(element, &[source], &[out])?;
        Ok(out)
    }

    /// Create an input wire with `niter` pulses, at `delay`, `2 * delay`, ...
    pub fn inp(&mut self, delay: f64, niter: usize, name: Option<&str>) -> Result<Wire, Error> {
        let times: Vec<f64> = (1..=niter).map(|n| delay * n as f64).collect();
        self.inp_at(&times, name)
    }

    /// Instantiate a cell type with per-instance overrides; return its output wires
    ///
    /// `names` is either empty, for unnamed outputs, or gives a name or `None` for each output.
    pub fn cell(
        &mut self,
        spec: &ElementSpec,
        overrides: &Overrides,
        inputs: &[Wire],
        names: &[Option<&str>],
    ) -> Result<Vec<Wire>, Error> {
        let element = Arc::new(spec.build(overrides)?);
        self.instantiate(element, inputs, names)
    }

    /// Instantiate an already built element; return its output wires
    pub fn instantiate(
        &mut self,
        element: Arc<Element>,
        inputs: &[Wire],
        names: &[Option<&str>],
    ) -> Result<Vec<Wire>, Error> {
        if !names.is_empty() && names.len() != element.nb_outputs() {
            return Err(TopologyError::NameCount {
                expected: element.nb_outputs(),
                got: names.len(),
            }
            .into());
        }
        self.check_inputs(&element, inputs)?;
        let outputs: Vec<Wire> = (0..element.nb_outputs())
            .map(|i| self.add_wire(names.get(i).copied().flatten()))
            .collect();
        self.add_node(element, inputs, &outputs)?;
        Ok(outputs)
    }

    /// Insert a functional element, firing every output selected by `f` after `delay`
    pub fn hole<F>(
        &mut self,
        name: &str,
        delay: f64,
        inputs: &[Wire],
        outputs: &[&str],
        f: F,
    ) -> Result<Vec<Wire>, Error>
    where
        F: Fn(&[bool], f64) -> Vec<bool> + Send + Sync + 'static,
    {
        let input_names: Vec<String> = (0..inputs.len()).map(|i| format!("i{i}")).collect();
        let input_names: Vec<&str> = input_names.iter().map(|s| s.as_str()).collect();
        let element = Element::functional(name, &input_names, outputs, delay, f)?;
        let names: Vec<Option<&str>> = outputs.iter().map(|o| Some(*o)).collect();
        self.instantiate(Arc::new(element), inputs, &names)
    }

    fn single(
        &mut self,
        spec: ElementSpec,
        inputs: &[Wire],
        name: Option<&str>,
    ) -> Result<Wire, Error> {
        let out = self.cell(&spec, &Overrides::new(), inputs, &[name])?;
        Ok(out[0])
    }

    /// Add a JTL
    pub fn jtl(&mut self, a: Wire, name: Option<&str>) -> Result<Wire, Error> {
        self.single(jtl(), &[a], name)
    }

    /// Add a C element
    pub fn c(&mut self, a: Wire, b: Wire, name: Option<&str>) -> Result<Wire, Error> {
        self.single(c(), &[a, b], name)
    }

    /// Add an inverted C element
    pub fn c_inv(&mut self, a: Wire, b: Wire, name: Option<&str>) -> Result<Wire, Error> {
        self.single(c_inv(), &[a, b], name)
    }

    /// Add a merger
    pub fn m(&mut self, a: Wire, b: Wire, name: Option<&str>) -> Result<Wire, Error> {
        self.single(m(), &[a, b], name)
    }

    /// Add a destructive read-out
    pub fn dro(&mut self, a: Wire, clk: Wire, name: Option<&str>) -> Result<Wire, Error> {
        self.single(dro(), &[a, clk], name)
    }

    /// Add a splitter
    pub fn s(
        &mut self,
        a: Wire,
        left: Option<&str>,
        right: Option<&str>,
    ) -> Result<(Wire, Wire), Error> {
        let out = self.cell(&s(), &Overrides::new(), &[a], &[left, right])?;
        Ok((out[0], out[1]))
    }

    /// Add a dual-rail 2x2 join; outputs are q00, q01, q10, q11
    pub fn join(
        &mut self,
        a_t: Wire,
        a_f: Wire,
        b_t: Wire,
        b_f: Wire,
        names: [Option<&str>; 4],
    ) -> Result<[Wire; 4], Error> {
        let out = self.cell(&two_by_two_join(), &Overrides::new(), &[a_t, a_f, b_t, b_f], &names)?;
        Ok([out[0], out[1], out[2], out[3]])
    }

    /// Split a wire `n` ways with a binary tree of `n - 1` splitters
    ///
    /// `names` is either empty or names every resulting wire, from left to right.
    pub fn split(
        &mut self,
        w: Wire,
        n: usize,
        names: &[&str],
        overrides: &Overrides,
    ) -> Result<Vec<Wire>, Error> {
        if n == 0 {
            return Err(TopologyError::InvalidFanout(n).into());
        }
        if !names.is_empty() && names.len() != n {
            return Err(TopologyError::NameCount {
                expected: n,
                got: names.len(),
            }
            .into());
        }
        let names: Vec<Option<&str>> = if names.is_empty() {
            vec![None; n]
        } else {
            names.iter().map(|n| Some(*n)).collect()
        };
        let element = Arc::new(s().build(overrides)?);
        let mut ret = Vec::with_capacity(n);
        self.split_tree(&element, w, &names, &mut ret)?;
        Ok(ret)
    }

    fn split_tree(
        &mut self,
        element: &Arc<Element>,
        w: Wire,
        names: &[Option<&str>],
        ret: &mut Vec<Wire>,
    ) -> Result<(), Error> {
        if names.len() == 1 {
            ret.push(w);
            return Ok(());
        }
        let ln = names.len() / 2;
        let left_name = if ln == 1 { names[0] } else { None };
        let right_name = if names.len() - ln == 1 { names[ln] } else { None };
        let out = self.instantiate(element.clone(), &[w], &[left_name, right_name])?;
        self.split_tree(element, out[0], &names[..ln], ret)?;
        self.split_tree(element, out[1], &names[ln..], ret)
    }

    /// Chain `n` JTLs; `names` name the last wires of the chain
    pub fn jtl_chain(
        &mut self,
        w: Wire,
        n: usize,
        names: &[&str],
        overrides: &Overrides,
    ) -> Result<Wire, Error> {
        if names.len() > n {
            return Err(TopologyError::NameCount {
                expected: n,
                got: names.len(),
            }
            .into());
        }
        let element = Arc::new(jtl().build(overrides)?);
        let mut cur = w;
        for i in 0..n {
            let name = (i + names.len()).checked_sub(n).map(|j| names[j]);
            cur = self.instantiate(element.clone(), &[cur], &[name])?[0];
        }
        Ok(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::simulate;

    #[test]
    fn test_library_builds() {
        for spec in [jtl(), c(), c_inv(), m(), s(), dro(), two_by_two_join(), connection()] {
            let e = spec.build(&Overrides::new()).unwrap();
            assert!(e.nb_outputs() > 0);
        }
        assert_eq!(c().build(&Overrides::new()).unwrap().jjs(), Some(5));
        assert_eq!(
            generator(&[1.0, -2.0]),
            Err(SpecError::InvalidGeneratorTime(-2.0))
        );
    }

    #[test]
    fn test_splitter() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[5.0], Some("a")).unwrap();
        circuit.s(a, Some("l"), Some("r")).unwrap();
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["a"], vec![5.0]);
        assert_eq!(events["l"], vec![9.3]);
        assert_eq!(events["r"], vec![9.3]);
    }

    #[test]
    fn test_coincidence() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[2.0], Some("a")).unwrap();
        let b = circuit.inp_at(&[5.0], Some("b")).unwrap();
        circuit.c(a, b, Some("q")).unwrap();
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["q"], vec![13.0]);
    }

    #[test]
    fn test_c_inv() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[2.0, 20.0], Some("a")).unwrap();
        let b = circuit.inp_at(&[5.0, 21.0], Some("b")).unwrap();
        circuit.c_inv(a, b, Some("q")).unwrap();
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["q"], vec![11.0, 29.0]);
    }

    #[test]
    fn test_merger() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0, 10.0], Some("a")).unwrap();
        let b = circuit.inp_at(&[5.0], Some("b")).unwrap();
        circuit.m(a, b, Some("q")).unwrap();
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["q"], vec![5.0, 9.0, 14.0]);
    }

    #[test]
    fn test_dro() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        let clk = circuit.inp(10.0, 2, Some("clk")).unwrap();
        circuit.dro(a, clk, Some("q")).unwrap();
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["clk"], vec![10.0, 20.0]);
        assert!((events["q"][0] - 15.1).abs() < 1e-9);
        assert_eq!(events["q"].len(), 1);
    }

    #[test]
    fn test_join() {
        let mut circuit = Circuit::new();
        let a_t = circuit.inp_at(&[], Some("a_t")).unwrap();
        let a_f = circuit.inp_at(&[1.0], Some("a_f")).unwrap();
        let b_t = circuit.inp_at(&[3.0], Some("b_t")).unwrap();
        let b_f = circuit.inp_at(&[], Some("b_f")).unwrap();
        circuit
            .join(a_t, a_f, b_t, b_f, [Some("q00"), Some("q01"), Some("q10"), Some("q11")])
            .unwrap();
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["q01"], vec![5.0]);
        assert!(events["q00"].is_empty());
        assert!(events["q10"].is_empty());
        assert!(events["q11"].is_empty());
    }

    #[test]
    fn test_split_tree() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        let outs = circuit
            .split(a, 3, &["x", "y", "z"], &Overrides::new())
            .unwrap();
        assert_eq!(outs.len(), 3);
        assert_eq!(circuit.nb_nodes(), 4);
        let events = simulate(&circuit, None).unwrap();
        // x goes through one splitter, y and z through two
        assert!((events["x"][0] - 5.3).abs() < 1e-9);
        assert!((events["y"][0] - 9.6).abs() < 1e-9);
        assert!((events["z"][0] - 9.6).abs() < 1e-9);

        let err = circuit.split(a, 2, &["u"], &Overrides::new()).unwrap_err();
        assert_eq!(
            err,
            Error::Topology(TopologyError::NameCount {
                expected: 2,
                got: 1
            })
        );
        let nb_wires = circuit.nb_wires();
        assert_eq!(
            circuit.split(a, 0, &[], &Overrides::new()),
            Err(Error::Topology(TopologyError::InvalidFanout(0)))
        );
        assert_eq!(circuit.nb_wires(), nb_wires);
    }

    #[test]
    fn test_rejected_cell_leaves_circuit_unchanged() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        let q = circuit.jtl(a, Some("q")).unwrap();
        let nb_wires = circuit.nb_wires();
        let err = circuit.jtl(a, Some("q")).unwrap_err();
        assert_eq!(err, Error::Topology(TopologyError::AlreadyConsumed("a".to_string())));
        assert_eq!(circuit.nb_wires(), nb_wires);
        assert_eq!(circuit.name(q), "q");
        assert_eq!(circuit.observed_as(q), Some("q"));
        assert_eq!(circuit.wire_by_name("q"), Some(q));

        let source = circuit.source_wire();
        assert!(circuit.inp_at(&[-1.0], Some("q")).is_err());
        assert!(circuit.cell(&jtl(), &Overrides::new(), &[source], &[Some("q")]).is_err());
        assert_eq!(circuit.nb_wires(), nb_wires);
        circuit.check();

        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["q"], vec![1.0 + 5.7]);
    }

    #[test]
    fn test_jtl_chain() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[0.0], Some("a")).unwrap();
        let out = circuit
            .jtl_chain(a, 3, &["j2", "j3"], &Overrides::new().firing_delay(2.0))
            .unwrap();
        assert_eq!(circuit.name(out), "j3");
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["j2"], vec![4.0]);
        assert_eq!(events["j3"], vec![6.0]);
        assert!(circuit.jtl_chain(a, 1, &["p", "q"], &Overrides::new()).is_err());
    }

    #[test]
    fn test_hole() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0, 4.0], Some("a")).unwrap();
        let b = circuit.inp_at(&[4.0], Some("b")).unwrap();
        circuit
            .hole("AND", 1.5, &[a, b], &["q"], |i, _| vec![i[0] && i[1]])
            .unwrap();
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["q"], vec![5.5]);
    }

    #[test]
    fn test_overrides_on_cell() {
        let mut circuit = Circuit::new();
        let a = circuit.inp_at(&[1.0], Some("a")).unwrap();
        let out = circuit
            .cell(&jtl(), &Overrides::new().firing_delay(1.0).jjs(9), &[a], &[Some("q")])
            .unwrap();
        let node = circuit.node(circuit.producer(out[0]).unwrap());
        assert_eq!(node.element().jjs(), Some(9));
        let events = simulate(&circuit, None).unwrap();
        assert_eq!(events["q"], vec![2.0]);
    }
}
