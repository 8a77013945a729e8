//! Process records, groups and signals.
//!
//! Every top-level command, pipeline stage, binary invocation and
//! background job runs as a process. Signals change a process's
//! [`RunState`]; the process notices at its next checkpoint.

mod signal;
mod table;

pub use signal::{Disposition, Signal, UnknownSignal};
pub use table::{Pid, ProcessKey, ProcessMeta, ProcessRecord, ProcessTable, RunState, SpawnOptions};
