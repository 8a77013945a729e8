//! Domain errors and the early-stop channel for term semantics.

use crate::process::{Pid, Signal};

/// A user-visible failure with a shell exit code.
///
/// These never crash the interpreter: the driver turns them into an exit
/// action on the term that raised them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TermError {
    #[error("{0}: no such file or directory")]
    NoSuchFile(String),
    #[error("{0}: not a directory")]
    NotADirectory(String),
    #[error("{0}: is a directory")]
    IsADirectory(String),
    #[error("{0}: file exists")]
    FileExists(String),
    #[error("{0}: directory not empty")]
    DirectoryNotEmpty(String),
    #[error("{0}: readonly function")]
    ReadonlyFunction(String),
    #[error("{0}: readonly variable")]
    ReadonlyVariable(String),
    #[error("({0}) - No such process")]
    NoSuchProcess(Pid),
    #[error("{0} must resolve to a level device")]
    NotALevelDevice(String),
    #[error("{0}: command not found")]
    CommandNotFound(String),
    #[error("{0}: bad file descriptor")]
    BadDescriptor(u32),
    #[error("broken pipe")]
    BrokenPipe,
    #[error("{0}: device detached")]
    DeviceDetached(String),
    #[error("level worker: {0}")]
    Worker(String),
    #[error("{message}")]
    Coded { code: i32, message: String },
}

impl TermError {
    /// A generic error with an explicit exit code.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        TermError::Coded {
            code,
            message: message.into(),
        }
    }

    /// A user-correctable error (exit code 1).
    pub fn usage(message: impl Into<String>) -> Self {
        TermError::new(1, message)
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            TermError::CommandNotFound(_) => 127,
            TermError::BrokenPipe => 128 + Signal::Pipe.number() as i32,
            TermError::Worker(_) => 2,
            TermError::Coded { code, .. } => *code,
            _ => 1,
        }
    }
}

/// Why a term's semantics stopped before running to completion.
///
/// Semantics return `Result<(), Halt>` so that `?` unwinds to the driver,
/// which owns the single exit action for the term.
#[derive(Debug)]
pub enum Halt {
    /// The term asked to exit with this code and optional diagnostic line.
    Exit { code: i32, line: Option<String> },
    /// A domain error.
    Error(TermError),
    /// The process was terminated by a signal.
    Signaled(Signal),
    /// Anything else; reported as exit code 2.
    Unexpected(anyhow::Error),
}

impl Halt {
    pub fn exit(code: i32) -> Self {
        Halt::Exit { code, line: None }
    }

    pub fn exit_with(code: i32, line: impl Into<String>) -> Self {
        Halt::Exit {
            code,
            line: Some(line.into()),
        }
    }
}

impl From<TermError> for Halt {
    fn from(err: TermError) -> Self {
        Halt::Error(err)
    }
}

impl From<anyhow::Error> for Halt {
    fn from(err: anyhow::Error) -> Self {
        Halt::Unexpected(err)
    }
}

/// Result type for term and command semantics.
pub type TermResult = Result<(), Halt>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(TermError::NoSuchFile("x".into()).exit_code(), 1);
        assert_eq!(TermError::CommandNotFound("x".into()).exit_code(), 127);
        assert_eq!(TermError::BrokenPipe.exit_code(), 141);
        assert_eq!(TermError::new(3, "boom").exit_code(), 3);
    }

    #[test]
    fn messages() {
        assert_eq!(
            TermError::NoSuchProcess(Pid(99999)).to_string(),
            "(99999) - No such process"
        );
        assert_eq!(
            TermError::NotALevelDevice("LEVEL".into()).to_string(),
            "LEVEL must resolve to a level device"
        );
    }
}
