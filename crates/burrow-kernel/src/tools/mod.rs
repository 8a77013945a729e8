//! Commands: the trait, argument parsing, the registry and the built-ins.

mod args;
pub mod builtin;
mod context;
pub mod escape;
pub mod format;
mod registry;
mod traits;

pub use args::ParsedArgs;
pub use context::ExecContext;
pub use registry::CommandRegistry;
pub use traits::{Command, CommandKind, OptSpec};
