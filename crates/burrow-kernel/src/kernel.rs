//! The Kernel: sessions, execution and levels.
//!
//! The Kernel owns the [`Os`] and the dispatcher terms talk to, and hands
//! out [`Session`]s. Each session has its own terminal device and a scope
//! that carries over from one `execute` to the next.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                        Kernel                        │
//! │  ┌──────────────┐  ┌─────────────┐  ┌─────────────┐  │
//! │  │  Sessions    │  │ Dispatcher  │  │     Os      │  │
//! │  │ (tty, scope) │──│  (actions)  │──│ procs, tree │  │
//! │  └──────────────┘  └─────────────┘  │ terms, cmds │  │
//! │                                     └─────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::ast::Term;
use crate::config::KernelConfig;
use crate::device::{LevelDevice, TtyDevice};
use crate::interpreter::{Dispatcher, Scope, run_term};
use crate::os::Os;
use crate::process::{Pid, Signal, SpawnOptions};
use crate::tools::{Command, ExecContext};

/// A terminal session: a tty device, a foreground slot and a scope.
#[derive(Debug)]
pub struct Session {
    key: String,
    tty_path: String,
    tty: Arc<TtyDevice>,
    interactive: bool,
    scope: Mutex<Scope>,
    foreground: Mutex<Option<Pid>>,
}

impl Session {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path of the terminal, e.g. `/dev/tty-1`.
    pub fn tty_path(&self) -> &str {
        &self.tty_path
    }

    pub fn tty(&self) -> &Arc<TtyDevice> {
        &self.tty
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Leader of the foreground process group, while something runs.
    pub fn foreground(&self) -> Option<Pid> {
        *self.foreground.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn var(&self, name: &str) -> Option<String> {
        self.scope
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .map(str::to_string)
    }

    pub fn set_var(&self, name: &str, value: impl Into<String>) -> Result<()> {
        self.scope
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .set(name, value)
            .with_context(|| format!("setting {name}"))
    }

    pub fn cwd(&self) -> String {
        self.scope
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cwd()
            .to_string()
    }

    pub fn last_exit(&self) -> i32 {
        self.scope.lock().unwrap_or_else(|e| e.into_inner()).last_exit()
    }

    /// `$!`: the most recent background job.
    pub fn last_background(&self) -> Option<Pid> {
        self.scope
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last_background()
    }

    fn scope(&self) -> Scope {
        self.scope.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_foreground(&self, pid: Option<Pid>) {
        *self.foreground.lock().unwrap_or_else(|e| e.into_inner()) = pid;
    }
}

/// The core burrow kernel.
pub struct Kernel {
    os: Arc<Os>,
    dispatcher: Arc<dyn Dispatcher>,
    sessions: AtomicU32,
}

impl std::fmt::Debug for Kernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kernel")
            .field("name", &self.os.config().name)
            .field("sessions", &self.sessions.load(Ordering::Relaxed))
            .finish()
    }
}

impl Kernel {
    /// Create a new kernel with the given configuration.
    pub fn new(config: KernelConfig) -> Result<Self> {
        Self::with_dispatcher(config, |os| os as Arc<dyn Dispatcher>)
    }

    /// Create a kernel whose terms talk to `wrap(os)` instead of the OS
    /// service directly. Tests use this to observe actions.
    pub fn with_dispatcher(
        config: KernelConfig,
        wrap: impl FnOnce(Arc<Os>) -> Arc<dyn Dispatcher>,
    ) -> Result<Self> {
        let name = config.name.clone();
        let os = Arc::new(Os::new(config).with_context(|| format!("booting kernel {name}"))?);
        let dispatcher = wrap(Arc::clone(&os));
        tracing::debug!(kernel = %name, "kernel ready");
        Ok(Self {
            os,
            dispatcher,
            sessions: AtomicU32::new(0),
        })
    }

    pub fn os(&self) -> &Arc<Os> {
        &self.os
    }

    /// Add a command, replacing any built-in of the same name.
    pub fn register_command(&self, command: impl Command + 'static) {
        self.os.register_command(Arc::new(command));
    }

    /// Mount a new terminal at `/dev/tty-<n>` and start a session on it.
    pub fn open_session(&self, interactive: bool) -> Result<Arc<Session>> {
        let n = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let key = format!("session-{n}");
        let tty_path = format!("/dev/tty-{n}");
        let config = self.os.config();
        let tty = Arc::new(TtyDevice::new(
            key.clone(),
            config.tty_lines_per_update,
            config.device_tick(),
            config.scrollback_lines,
        ));
        self.os
            .tree()
            .mount_device(&tty_path, Arc::clone(&tty) as _)
            .with_context(|| format!("mounting {tty_path}"))?;

        let mut scope = Scope::new(config.home.clone());
        scope.set("HOME", config.home.clone())?;
        scope.set("PWD", config.home.clone())?;
        tracing::debug!(session = %key, %tty_path, interactive, "session opened");
        Ok(Arc::new(Session {
            key,
            tty_path,
            tty,
            interactive,
            scope: Mutex::new(scope),
            foreground: Mutex::new(None),
        }))
    }

    /// Run `term` in the foreground of `session` and return its status.
    ///
    /// The term runs under a Shell root in a new process group; variables,
    /// functions and the working directory it leaves behind carry over to
    /// the session.
    pub async fn execute(&self, session: &Session, term: Term) -> Result<i32> {
        let fds = self
            .os
            .session_fds(&session.tty_path)
            .with_context(|| format!("opening {}", session.tty_path))?;
        let pid = self.os.spawn(SpawnOptions {
            parent: None,
            pgid: None,
            session: Some(session.key.clone()),
            interactive: session.interactive,
            command: term.to_string(),
            fds,
            scope: session.scope(),
        })?;
        session.set_foreground(Some(pid));

        let root = Arc::new(Term::shell(session.interactive, term));
        let node = self.os.insert_term(root, None);
        let cx = ExecContext::new(Arc::clone(&self.os), Arc::clone(&self.dispatcher), pid, node);
        run_term(cx).await;

        let state = self.os.free_term(node);
        session.set_foreground(None);
        if let Some(record) = self.os.reap(pid) {
            *session.scope.lock().unwrap_or_else(|e| e.into_inner()) = record.scope;
        }
        session.tty.flush().await;

        let code = state.status();
        tracing::debug!(session = %session.key, %pid, code, "execute finished");
        Ok(code)
    }

    /// Ctrl-C: drop the terminal's pending input and output, then send INT
    /// to the foreground group. Background jobs are untouched.
    pub fn interrupt(&self, session: &Session) -> usize {
        let dropped = session.tty.clear_pending();
        let Some(leader) = session.foreground() else {
            return 0;
        };
        let pgid = self.os.pgid_of(leader).unwrap_or(leader);
        let reached = self.os.signal_group(pgid, Signal::Int);
        tracing::debug!(session = %session.key, %pgid, reached, dropped, "interrupt");
        reached
    }

    /// Create (or reuse) the level `name`, mounted at `/dev/level-<name>`.
    pub async fn ensure_level(&self, name: &str) -> Result<String> {
        self.os
            .ensure_level(name)
            .await
            .with_context(|| format!("creating level {name}"))
    }

    pub fn level(&self, name: &str) -> Option<Arc<LevelDevice>> {
        self.os.level(name)
    }

    pub async fn destroy_level(&self, name: &str) -> Result<()> {
        self.os
            .destroy_level(name)
            .await
            .with_context(|| format!("destroying level {name}"))
    }

    /// Level names the worker knows about.
    pub async fn levels(&self) -> Result<Vec<String>> {
        Ok(self.os.level_names().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Word;

    fn kernel() -> Kernel {
        Kernel::new(KernelConfig::fast()).unwrap()
    }

    #[tokio::test]
    async fn sessions_get_their_own_terminal() {
        let kernel = kernel();
        let one = kernel.open_session(true).unwrap();
        let two = kernel.open_session(false).unwrap();
        assert_eq!(one.tty_path(), "/dev/tty-1");
        assert_eq!(two.tty_path(), "/dev/tty-2");
        assert!(kernel.os().tree().exists("/dev/tty-2", "/"));
        assert_eq!(one.cwd(), "/home/user");
    }

    #[tokio::test]
    async fn scope_carries_over_between_executions() {
        let kernel = kernel();
        let session = kernel.open_session(false).unwrap();
        let code = kernel.execute(&session, Term::assign("GREETING", "hi")).await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(session.var("GREETING").as_deref(), Some("hi"));

        kernel
            .execute(&session, Term::words(vec![Word::lit("echo"), Word::param("GREETING")]))
            .await
            .unwrap();
        assert_eq!(session.tty().screen_lines(), vec!["hi"]);
        assert_eq!(kernel.os().process_count(), 0);
        assert_eq!(kernel.os().live_terms(), 0);
    }

    #[tokio::test]
    async fn interrupt_without_foreground_reaches_nobody() {
        let kernel = kernel();
        let session = kernel.open_session(true).unwrap();
        assert_eq!(kernel.interrupt(&session), 0);
    }

    #[tokio::test]
    async fn levels_are_created_once() {
        let kernel = kernel();
        let path = kernel.ensure_level("alpha").await.unwrap();
        assert_eq!(path, "/dev/level-alpha");
        kernel.ensure_level("alpha").await.unwrap();
        assert_eq!(kernel.levels().await.unwrap(), vec!["alpha"]);
        assert!(kernel.level("alpha").is_some());
        assert!(kernel.ensure_level("bad name").await.is_err());
    }
}
