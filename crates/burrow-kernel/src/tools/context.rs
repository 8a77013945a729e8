//! Execution context for terms and commands.

use std::sync::Arc;

use crate::ast::Term;
use crate::config::KernelConfig;
use crate::error::{Halt, TermError, TermResult};
use crate::interpreter::{Ack, Action, Dispatcher, ExecState, Scope, TermId};
use crate::os::Os;
use crate::process::Pid;
use crate::vfs::{INodeRef, OpenFile, OpenMode, normalize};

/// What a running term or command can reach: the process it runs in, its
/// node in the term arena, and the dispatcher that carries out its actions.
///
/// Cloning is cheap; children get their own context through
/// [`for_term`](Self::for_term) and [`for_process`](Self::for_process).
#[derive(Clone)]
pub struct ExecContext {
    os: Arc<Os>,
    dispatcher: Arc<dyn Dispatcher>,
    pub pid: Pid,
    pub term: TermId,
}

impl std::fmt::Debug for ExecContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecContext")
            .field("pid", &self.pid)
            .field("term", &self.term)
            .finish()
    }
}

impl ExecContext {
    pub fn new(os: Arc<Os>, dispatcher: Arc<dyn Dispatcher>, pid: Pid, term: TermId) -> Self {
        Self {
            os,
            dispatcher,
            pid,
            term,
        }
    }

    pub fn os(&self) -> &Arc<Os> {
        &self.os
    }

    pub fn config(&self) -> &KernelConfig {
        self.os.config()
    }

    /// Same process, another node.
    pub fn for_term(&self, term: TermId) -> Self {
        Self {
            term,
            ..self.clone()
        }
    }

    pub fn for_process(&self, pid: Pid, term: TermId) -> Self {
        Self {
            pid,
            term,
            ..self.clone()
        }
    }

    pub async fn emit(&self, action: Action) -> Result<Ack, Halt> {
        self.dispatcher.dispatch(self.pid, action).await
    }

    /// Halt here if the process has been terminated; park while suspended.
    pub async fn checkpoint(&self) -> TermResult {
        self.os.checkpoint(self.pid).await
    }

    /// Read from standard input. Returns false at end of file.
    pub async fn read(&self, max_lines: usize, buffer: &mut Vec<String>) -> Result<bool, Halt> {
        self.read_fd(0, max_lines, buffer).await
    }

    pub async fn read_fd(&self, fd: u32, max_lines: usize, buffer: &mut Vec<String>) -> Result<bool, Halt> {
        self.checkpoint().await?;
        let ack = self
            .emit(Action::Read {
                term: self.term,
                fd,
                max_lines,
            })
            .await?;
        match ack {
            Ack::Read(lines) if !lines.is_empty() => {
                buffer.extend(lines);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Read standard input to end of file.
    pub async fn read_all(&self) -> Result<Vec<String>, Halt> {
        let mut buffer = Vec::new();
        let max = self.config().max_lines_per_read;
        while self.read(max, &mut buffer).await? {}
        Ok(buffer)
    }

    /// Read a whole file by path, checkpointing between chunks.
    pub async fn read_path(&self, path: &str) -> Result<Vec<String>, Halt> {
        let file = self.open(path, OpenMode::Read)?;
        let max = self.config().max_lines_per_read.max(1);
        let mut buffer = Vec::new();
        loop {
            self.checkpoint().await?;
            let read = tokio::select! {
                read = file.read(&mut buffer, max) => read?,
                signal = self.os.terminated(self.pid) => return Err(Halt::Signaled(signal)),
            };
            if read == 0 {
                return Ok(buffer);
            }
        }
    }

    /// Write lines to standard output.
    pub async fn write<I, S>(&self, lines: I) -> TermResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write_fd(1, lines).await
    }

    pub async fn write_fd<I, S>(&self, fd: u32, lines: I) -> TermResult
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        self.checkpoint().await?;
        self.emit(Action::Write {
            term: self.term,
            fd,
            lines,
        })
        .await?;
        Ok(())
    }

    /// A diagnostic line on standard error.
    pub async fn warn(&self, line: impl Into<String>) -> TermResult {
        self.checkpoint().await?;
        self.emit(Action::Warn {
            term: self.term,
            line: line.into(),
        })
        .await?;
        Ok(())
    }

    /// The status this term reports when it finishes normally.
    pub fn set_exit_code(&self, code: i32) {
        // A freed node has nobody left to report to.
        let _ = self.update_state(|state| state.pending = Some(code));
    }

    pub fn state(&self) -> ExecState {
        self.os.term_state(self.term)
    }

    pub fn update_state<R>(&self, f: impl FnOnce(&mut ExecState) -> R) -> Result<R, Halt> {
        self.os
            .update_term(self.term, |node| f(&mut node.state))
            .ok_or_else(|| Halt::Unexpected(anyhow::anyhow!("term {} is not in the arena", self.term)))
    }

    pub fn def(&self) -> Result<Arc<Term>, Halt> {
        self.os
            .term_def(self.term)
            .ok_or_else(|| Halt::Unexpected(anyhow::anyhow!("term {} is not in the arena", self.term)))
    }

    /// Run `f` against this process's scope.
    pub fn with_scope<R>(&self, f: impl FnOnce(&mut Scope) -> R) -> Result<R, Halt> {
        self.os
            .with_scope(self.pid, f)
            .ok_or_else(|| Halt::Unexpected(anyhow::anyhow!("process {} has no record", self.pid)))
    }

    pub fn var(&self, name: &str) -> Option<String> {
        self.with_scope(|scope| scope.get(name).map(str::to_string))
            .ok()
            .flatten()
    }

    pub fn cwd(&self) -> String {
        self.with_scope(|scope| scope.cwd().to_string())
            .unwrap_or_else(|_| "/".to_string())
    }

    /// Absolute, normalised form of `path`.
    pub fn absolute(&self, path: &str) -> String {
        normalize(path, &self.cwd())
    }

    pub fn resolve(&self, path: &str) -> Result<INodeRef, TermError> {
        self.os.tree().resolve(path, &self.cwd())
    }

    pub fn open(&self, path: &str, mode: OpenMode) -> Result<Arc<OpenFile>, TermError> {
        self.os.open(path, &self.cwd(), mode)
    }

    pub fn is_interactive(&self) -> bool {
        self.os.is_interactive(self.term)
    }

    pub fn inside_function(&self) -> bool {
        self.os.inside_function(self.term)
    }

    pub fn enclosing_loops(&self) -> u32 {
        self.os.enclosing_loops(self.term)
    }
}
