//! Circuit generators and templates
//!
//! Inputs are named `a`, or `i0`, `i1`, ... when there are several; outputs are named `q`, or `q0`, `q1`, ...

/// Transmission lines
pub mod line {
    use crate::error::Error;
    use crate::fsm::Overrides;
    use crate::Circuit;

    /// A chain of JTLs fed by an input pulsing at the given times
    pub fn jtl(len: usize, times: &[f64], overrides: &Overrides) -> Result<Circuit, Error> {
        assert!(len > 0);
        let mut ret = Circuit::new();
        let a = ret.inp_at(times, Some("a"))?;
        ret.jtl_chain(a, len, &["q"], overrides)?;
        ret.check();
        Ok(ret)
    }
}

/// Fanout trees
pub mod fanout {
    use crate::error::Error;
    use crate::fsm::Overrides;
    use crate::Circuit;

    /// A tree of splitters, duplicating one input to `n` outputs
    pub fn split_tree(n: usize, times: &[f64], overrides: &Overrides) -> Result<Circuit, Error> {
        assert!(n > 1);
        let mut ret = Circuit::new();
        let a = ret.inp_at(times, Some("a"))?;
        let names: Vec<String> = (0..n).map(|i| format!("q{i}")).collect();
        let names: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        ret.split(a, n, &names, overrides)?;
        ret.check();
        Ok(ret)
    }
}

/// Synchronization of several pulse streams
pub mod coincidence {
    use crate::error::Error;
    use crate::Circuit;

    /// A tree of C elements over `n` inputs, for `niter` rounds of the given period
    ///
    /// Input `k` pulses at time `k + 1` of each round, and the output pulses once all inputs have
    /// pulsed. The period must exceed the depth of the tree.
    pub fn c_tree(n: usize, period: f64, niter: usize) -> Result<Circuit, Error> {
        assert!(n > 1);
        let mut ret = Circuit::new();
        let mut stage = Vec::new();
        for k in 0..n {
            let times: Vec<f64> = (0..niter)
                .map(|r| (k + 1) as f64 + period * r as f64)
                .collect();
            stage.push(ret.inp_at(&times, Some(&format!("i{k}")))?);
        }
        while stage.len() > 1 {
            let mut next_stage = Vec::new();
            for pair in stage.chunks(2) {
                let name = if stage.len() == 2 { Some("q") } else { None };
                match pair {
                    [a, b] => next_stage.push(ret.c(*a, *b, name)?),
                    [a] => next_stage.push(*a),
                    _ => unreachable!(),
                }
            }
            stage = next_stage;
        }
        ret.check();
        Ok(ret)
    }
}

/// Circuits with feedback loops; they must be simulated with a horizon
pub mod feedback {
    use crate::error::Error;
    use crate::fsm::Overrides;
    use crate::Circuit;

    /// A merger whose output loops back to one of its inputs through a chain of JTLs
    ///
    /// A single input pulse at time 0 circulates forever.
    pub fn ring(len: usize) -> Result<Circuit, Error> {
        assert!(len > 0);
        let mut ret = Circuit::new();
        let a = ret.inp_at(&[0.0], Some("a"))?;
        let loopback = ret.add_wire(None);
        let q = ret.m(a, loopback, Some("q"))?;
        let back = ret.jtl_chain(q, len, &[], &Overrides::new())?;
        ret.redirect(loopback, back)?;
        ret.check();
        Ok(ret)
    }
}

/// Race logic, where values are encoded by pulse arrival times
pub mod race {
    use crate::error::Error;
    use crate::fsm::Overrides;
    use crate::{Circuit, Wire};

    /// Delay of one comparator stage: a splitter followed by a first- or last-arrival cell
    pub const STAGE_DELAY: f64 = 4.3 + 9.0;

    /// Compare two values; return the first and last arrivals
    pub fn comparator(c: &mut Circuit, a: Wire, b: Wire) -> Result<(Wire, Wire), Error> {
        let (a0, a1) = c.s(a, None, None)?;
        let (b0, b1) = c.s(b, None, None)?;
        let min = c.c_inv(a0, b0, None)?;
        let max = c.cell(
            &crate::cells::c(),
            &Overrides::new().firing_delay(9.0),
            &[a1, b1],
            &[],
        )?[0];
        Ok((min, max))
    }

    /// An odd-even transposition sorting network over inputs pulsing once at the given times
    ///
    /// Output `k` pulses at the `k`-th smallest input time, delayed by one stage per layer.
    pub fn sorting_network(times: &[f64]) -> Result<Circuit, Error> {
        let n = times.len();
        assert!(n > 0);
        let mut ret = Circuit::new();
        let mut lanes = Vec::new();
        for (k, t) in times.iter().enumerate() {
            lanes.push(ret.inp_at(&[*t], Some(&format!("i{k}")))?);
        }
        let pass = Overrides::new().firing_delay(STAGE_DELAY);
        for layer in 0..n {
            let mut next = lanes.clone();
            let mut compared = vec![false; n];
            let mut i = layer % 2;
            while i + 1 < n {
                let (lo, hi) = comparator(&mut ret, lanes[i], lanes[i + 1])?;
                next[i] = lo;
                next[i + 1] = hi;
                compared[i] = true;
                compared[i + 1] = true;
                i += 2;
            }
            for (k, done) in compared.iter().enumerate() {
                if !done {
                    next[k] = ret.jtl_chain(lanes[k], 1, &[], &pass)?;
                }
            }
            lanes = next;
        }
        for (k, w) in lanes.iter().enumerate() {
            ret.inspect(*w, &format!("q{k}"));
        }
        ret.check();
        Ok(ret)
    }
}
