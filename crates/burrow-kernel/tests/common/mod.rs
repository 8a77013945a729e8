//! Shared harness for the kernel integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use burrow_kernel::interpreter::{Ack, Action, Dispatcher, TermId};
use burrow_kernel::process::{Pid, RunState};
use burrow_kernel::tools::{Command, CommandKind, ExecContext, ParsedArgs};
use burrow_kernel::{Halt, Kernel, KernelConfig, Os, Session, Term, TermResult, Word};

/// A kernel with one session on it.
pub struct Shell {
    pub kernel: Arc<Kernel>,
    pub session: Arc<Session>,
}

impl Shell {
    pub fn new(interactive: bool) -> Self {
        let kernel = Kernel::new(KernelConfig::fast()).expect("kernel boots");
        Self::with_kernel(kernel, interactive)
    }

    pub fn with_kernel(kernel: Kernel, interactive: bool) -> Self {
        kernel.register_command(TestEq);
        let session = kernel.open_session(interactive).expect("session opens");
        Self {
            kernel: Arc::new(kernel),
            session,
        }
    }

    /// Run a term; returns its status and the terminal lines it produced.
    pub async fn run(&self, term: Term) -> (i32, Vec<String>) {
        let code = self
            .kernel
            .execute(&self.session, term)
            .await
            .expect("execute");
        (code, self.session.tty().take_screen())
    }

    /// Type lines at the terminal, then end input.
    pub fn input(&self, lines: &[&str]) {
        for line in lines {
            self.session.tty().send_line(*line);
        }
        self.session.tty().close_input();
    }

    pub fn os(&self) -> &Arc<Os> {
        self.kernel.os()
    }

    pub fn state_of(&self, pid: Pid) -> Option<RunState> {
        self.os()
            .process_metas()
            .into_iter()
            .find(|meta| meta.pid == pid)
            .map(|meta| meta.state)
    }

    /// Poll until `pid` has been reaped.
    pub async fn wait_reaped(&self, pid: Pid) {
        for _ in 0..2000 {
            if self.state_of(pid).is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("process {pid} was never reaped");
    }
}

/// A simple command; words starting with `$` are parameters.
pub fn sh(words: &[&str]) -> Term {
    Term::words(words.iter().map(|w| word(w)).collect())
}

pub fn word(text: &str) -> Word {
    match text.strip_prefix('$') {
        Some(name) => Word::param(name),
        None => Word::lit(text),
    }
}

/// Adjacent words forming one, e.g. `$i$j`.
pub fn concat(parts: &[&str]) -> Word {
    Word::Concat(parts.iter().map(|p| word(p)).collect())
}

/// `test-eq a b`: status 0 when the operands are equal.
pub struct TestEq;

#[async_trait]
impl Command for TestEq {
    fn name(&self) -> &str {
        "test-eq"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let equal = matches!(args.operands.as_slice(), [a, b] if a == b);
        cx.set_exit_code(if equal { 0 } else { 1 });
        Ok(())
    }
}

/// Forwards to the OS, recording every action on the way.
pub struct Recorder {
    inner: Arc<Os>,
    pub actions: Mutex<Vec<(Pid, Action)>>,
}

impl Recorder {
    pub fn new(inner: Arc<Os>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            actions: Mutex::new(Vec::new()),
        })
    }

    pub fn actions(&self) -> Vec<(Pid, Action)> {
        self.actions.lock().unwrap().clone()
    }

    /// Enter/exit keys of one term, in order.
    pub fn lifecycle(&self, term: TermId) -> Vec<&'static str> {
        self.actions()
            .into_iter()
            .filter(|(_, action)| action.term() == term)
            .map(|(_, action)| action.key())
            .filter(|key| *key == "enter" || *key == "exit")
            .collect()
    }

    /// Every term that emitted an action, in first-seen order.
    pub fn terms(&self) -> Vec<TermId> {
        let mut seen = Vec::new();
        for (_, action) in self.actions() {
            if !seen.contains(&action.term()) {
                seen.push(action.term());
            }
        }
        seen
    }

    /// Exit code reported for `term`.
    pub fn exit_code(&self, term: TermId) -> Option<i32> {
        self.actions().into_iter().find_map(|(_, action)| match action {
            Action::Exit { term: t, code, .. } if t == term => Some(code),
            _ => None,
        })
    }
}

#[async_trait]
impl Dispatcher for Recorder {
    async fn dispatch(&self, pid: Pid, action: Action) -> Result<Ack, Halt> {
        self.actions.lock().unwrap().push((pid, action.clone()));
        self.inner.dispatch(pid, action).await
    }
}

/// A shell whose dispatcher records actions.
pub fn recorded(interactive: bool) -> (Shell, Arc<Recorder>) {
    let slot: Arc<Mutex<Option<Arc<Recorder>>>> = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&slot);
    let kernel = Kernel::with_dispatcher(KernelConfig::fast(), move |os| {
        let recorder = Recorder::new(os);
        *captured.lock().unwrap() = Some(Arc::clone(&recorder));
        recorder as Arc<dyn Dispatcher>
    })
    .expect("kernel boots");
    let recorder = slot.lock().unwrap().take().expect("recorder installed");
    (Shell::with_kernel(kernel, interactive), recorder)
}
