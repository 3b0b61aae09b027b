//! Timed finite-state machines describing the behavior of cells
//!
//! A cell type is declared as an [`ElementSpec`], a list of [`TransitionSpec`]s plus defaults.
//! Building it validates the declaration once and yields an [`Element`], whose normalized
//! [`TransitionTable`] has one [`Transition`] per trigger with every delay resolved.
//! Each cell instance then keeps its own [`Fsm`], stepped by the simulator.

mod element;
mod machine;
mod overrides;
mod spec;
mod table;

pub use element::{Element, FunctionalFn};
pub use machine::{Fsm, FsmState};
pub use overrides::{DelayOverride, DwellOverride, OverrideValue, Overrides, PastOverride};
pub use spec::{Dwell, ElementKind, ElementSpec, FiringDelay, TransitionSpec, ANY_INPUT};
pub use table::{StateId, Transition, TransitionTable, IDLE};
