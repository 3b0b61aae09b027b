use std::fmt;

/// Prefix of automatically generated wire names; such wires are not observed
pub const TEMPORARY_PREFIX: &str = "_";

/// Name of the global source wire, which feeds every input generator
pub const SOURCE_WIRE: &str = "_sys_input";

/// Handle to a wire in a [`Circuit`](super::Circuit)
///
/// Wires carry instantaneous pulses. The handle is a plain index, only meaningful in the circuit
/// that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Wire {
    ix: u32,
}

impl Wire {
    pub(crate) fn from_index(ix: usize) -> Wire {
        Wire { ix: ix as u32 }
    }

    /// Index of the wire in its circuit
    pub fn index(&self) -> usize {
        self.ix as usize
    }
}

impl fmt::Display for Wire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.ix)
    }
}

/// Return whether a name is an automatically generated one
pub fn is_temporary_name(name: &str) -> bool {
    name.starts_with(TEMPORARY_PREFIX)
}

/// Naming and observation status of a wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WireData {
    pub name: String,
    pub observed_as: Option<String>,
}

impl WireData {
    pub fn new(name: String) -> WireData {
        let observed_as = if is_temporary_name(&name) {
            None
        } else {
            Some(name.clone())
        };
        WireData { name, observed_as }
    }
}
