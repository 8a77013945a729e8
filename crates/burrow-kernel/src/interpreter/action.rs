//! Actions emitted by running terms, and the dispatcher that serves them.

use async_trait::async_trait;

use super::arena::TermId;
use crate::error::Halt;
use crate::process::Pid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Enter { term: TermId },
    Exit { term: TermId, code: i32, line: Option<String> },
    Read { term: TermId, fd: u32, max_lines: usize },
    Write { term: TermId, fd: u32, lines: Vec<String> },
    Warn { term: TermId, line: String },
}

impl Action {
    pub fn term(&self) -> TermId {
        match self {
            Action::Enter { term }
            | Action::Exit { term, .. }
            | Action::Read { term, .. }
            | Action::Write { term, .. }
            | Action::Warn { term, .. } => *term,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Action::Enter { .. } => "enter",
            Action::Exit { .. } => "exit",
            Action::Read { .. } => "read",
            Action::Write { .. } => "write",
            Action::Warn { .. } => "warn",
        }
    }
}

/// The dispatcher's answer to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Done,
    /// Lines read; empty means end of file.
    Read(Vec<String>),
    Written(usize),
}

/// The effect boundary between running terms and the rest of the system.
///
/// The interpreter never looks behind it: reads, writes and lifecycle
/// notifications all go through `dispatch`.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, pid: Pid, action: Action) -> Result<Ack, Halt>;
}
