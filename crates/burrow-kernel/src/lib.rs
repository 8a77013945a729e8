//! burrow-kernel: the core of the burrow shell.
//!
//! This crate provides:
//!
//! - **AST**: serialisable term definitions (commands, pipelines, loops,
//!   functions) as produced by a parser
//! - **Interpreter**: a term arena, the driver envelope and per-variant
//!   semantics, with break/continue/return threaded through `ExecState`
//! - **Processes**: pids, groups, signals and run states
//! - **VFS**: an in-memory file tree with pipes and device inodes
//! - **Devices**: level, tty and null devices with batched command queues
//! - **Tools**: option parsing, the command registry and the built-ins
//! - **Worker**: the message protocol spoken with the level worker
//!
//! [`Kernel`] ties these together behind sessions.

pub mod ast;
pub mod config;
pub mod device;
pub mod error;
pub mod interpreter;
pub mod kernel;
pub mod os;
pub mod process;
pub mod tools;
pub mod vfs;
pub mod worker;

pub use ast::{Term, Word};
pub use config::KernelConfig;
pub use error::{Halt, TermError, TermResult};
pub use kernel::{Kernel, Session};
pub use os::Os;
pub use process::{Pid, Signal};
