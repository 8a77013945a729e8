//! Interpreter core for burrow.
//!
//! This module provides:
//! - `TermArena`: running term nodes with parent ids for ancestor queries
//! - `ExecState`: per-node exit status and loop-control depths
//! - `Scope`: variable frames, functions, `$?` and `$!`
//! - Word expansion
//! - The driver envelope (`run_term`) and the per-variant semantics

mod action;
mod arena;
mod control_flow;
mod driver;
pub mod expand;
mod scope;
mod semantics;

pub use action::{Ack, Action, Dispatcher};
pub use arena::{Ancestors, TermArena, TermId, TermNode};
pub use control_flow::{ExecState, LoopStep};
pub use driver::{TermFuture, run_term};
pub use scope::{FunctionEntry, Scope};
