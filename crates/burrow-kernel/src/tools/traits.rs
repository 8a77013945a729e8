//! The command trait.

use async_trait::async_trait;

use super::args::ParsedArgs;
use super::context::ExecContext;
use crate::error::TermResult;

/// Where a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// In the invoking process; may change its scope.
    Builtin,
    /// In a child process of the same group, reaped afterwards.
    Binary,
}

/// Option names a command accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptSpec {
    /// Options that take a value (`-v NAME`, `-vNAME`, `--v=NAME`).
    pub string: Vec<String>,
    pub boolean: Vec<String>,
    /// Stop option parsing at the first operand.
    pub stop_early: bool,
}

impl OptSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn string(mut self, name: &str) -> Self {
        self.string.push(name.to_string());
        self
    }

    pub fn boolean(mut self, name: &str) -> Self {
        self.boolean.push(name.to_string());
        self
    }

    pub fn stop_early(mut self) -> Self {
        self.stop_early = true;
        self
    }
}

/// A command that can be run by name from a simple command.
#[async_trait]
pub trait Command: Send + Sync {
    /// The command's name.
    fn name(&self) -> &str;

    fn kind(&self) -> CommandKind;

    /// Options to parse before `run`.
    fn spec(&self) -> OptSpec {
        OptSpec::default()
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult;
}
