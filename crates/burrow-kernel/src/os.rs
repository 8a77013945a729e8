//! The OS service behind the dispatcher boundary.
//!
//! `Os` owns the process table, the term arena, the file tree and the
//! command registry. Terms never touch these directly for I/O: reads,
//! writes and lifecycle notifications arrive as [`Action`]s through the
//! [`Dispatcher`] impl at the bottom of this file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::ast::Term;
use crate::config::KernelConfig;
use crate::device::{Device, LevelDevice, NullDevice};
use crate::error::{Halt, TermError, TermResult};
use crate::interpreter::{Ack, Action, Dispatcher, ExecState, Scope, TermArena, TermId, TermNode};
use crate::process::{Pid, ProcessMeta, ProcessRecord, ProcessTable, RunState, Signal, SpawnOptions};
use crate::tools::{Command, CommandRegistry};
use crate::vfs::{FdTable, Fifo, FileTree, INode, OpenFile, OpenMode};
use crate::worker::WorkerClient;

pub const DEV_NULL: &str = "/dev/null";

/// Descriptors replaced for the duration of one command, with what they
/// replaced.
pub type SavedFds = Vec<(u32, Option<Arc<OpenFile>>)>;

#[derive(Debug)]
pub struct Os {
    config: KernelConfig,
    tree: FileTree,
    processes: Mutex<ProcessTable>,
    arena: Mutex<TermArena>,
    commands: RwLock<CommandRegistry>,
    levels: Mutex<HashMap<String, Arc<LevelDevice>>>,
    worker: OnceCell<WorkerClient>,
    pipes: AtomicU64,
}

impl Os {
    pub fn new(config: KernelConfig) -> Result<Self, TermError> {
        let tree = FileTree::new();
        tree.mkdir("/dev", "/", true)?;
        tree.mkdir("/tmp", "/", true)?;
        tree.mkdir(&config.home, "/", true)?;
        tree.mount_device(DEV_NULL, Arc::new(NullDevice))?;
        Ok(Self {
            processes: Mutex::new(ProcessTable::new(config.max_pid)),
            config,
            tree,
            arena: Mutex::new(TermArena::default()),
            commands: RwLock::new(CommandRegistry::with_builtins()),
            levels: Mutex::new(HashMap::new()),
            worker: OnceCell::new(),
            pipes: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn tree(&self) -> &FileTree {
        &self.tree
    }

    fn procs(&self) -> MutexGuard<'_, ProcessTable> {
        self.processes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn terms(&self) -> MutexGuard<'_, TermArena> {
        self.arena.lock().unwrap_or_else(|e| e.into_inner())
    }

    // --- commands ---

    pub fn command(&self, name: &str) -> Option<Arc<dyn Command>> {
        self.commands
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
    }

    pub fn register_command(&self, command: Arc<dyn Command>) {
        self.commands
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .register_arc(command);
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // --- processes ---

    pub fn spawn(&self, opts: SpawnOptions) -> Result<Pid, TermError> {
        self.procs()
            .spawn(opts)
            .ok_or_else(|| TermError::new(2, "process table is full"))
    }

    /// A child in the parent's group, inheriting its descriptors (with
    /// `overrides` applied) and a copy of its scope.
    pub fn spawn_child(
        &self,
        parent: Pid,
        command: &str,
        overrides: Vec<(u32, Arc<OpenFile>)>,
    ) -> Result<Pid, TermError> {
        let mut procs = self.procs();
        let record = procs.get(parent).ok_or(TermError::NoSuchProcess(parent))?;
        let mut fds = record.fds.clone();
        for (fd, file) in overrides {
            fds.set(fd, file);
        }
        let opts = SpawnOptions {
            parent: Some(parent),
            pgid: Some(record.pgid),
            session: record.session.clone(),
            interactive: false,
            command: command.to_string(),
            fds,
            scope: record.scope.clone(),
        };
        procs
            .spawn(opts)
            .ok_or_else(|| TermError::new(2, "process table is full"))
    }

    /// A background job: leader of a new group, stdin from `/dev/null`.
    pub fn spawn_job(&self, parent: Pid, command: &str) -> Result<Pid, TermError> {
        let null = self.open(DEV_NULL, "/", OpenMode::Read)?;
        let mut procs = self.procs();
        let record = procs.get(parent).ok_or(TermError::NoSuchProcess(parent))?;
        let mut fds = record.fds.clone();
        fds.set(0, null);
        let opts = SpawnOptions {
            parent: Some(parent),
            pgid: None,
            session: record.session.clone(),
            interactive: false,
            command: command.to_string(),
            fds,
            scope: record.scope.clone(),
        };
        procs
            .spawn(opts)
            .ok_or_else(|| TermError::new(2, "process table is full"))
    }

    /// Remove a finished process. Its descriptors close as the record drops.
    pub fn reap(&self, pid: Pid) -> Option<ProcessRecord> {
        self.procs().reap(pid)
    }

    pub fn with_process<R>(&self, pid: Pid, f: impl FnOnce(&mut ProcessRecord) -> R) -> Option<R> {
        self.procs().get_mut(pid).map(f)
    }

    pub fn with_scope<R>(&self, pid: Pid, f: impl FnOnce(&mut Scope) -> R) -> Option<R> {
        self.with_process(pid, |record| f(&mut record.scope))
    }

    pub fn pgid_of(&self, pid: Pid) -> Option<Pid> {
        self.procs().get(pid).map(|p| p.pgid)
    }

    pub fn signal(&self, pid: Pid, signal: Signal) -> Result<(), TermError> {
        if self.procs().signal(pid, signal) {
            Ok(())
        } else {
            Err(TermError::NoSuchProcess(pid))
        }
    }

    pub fn signal_group(&self, pgid: Pid, signal: Signal) -> usize {
        self.procs().signal_group(pgid, signal)
    }

    pub fn process_metas(&self) -> Vec<ProcessMeta> {
        self.procs().metas()
    }

    pub fn process_count(&self) -> usize {
        self.procs().len()
    }

    /// Observe delivered signals: halt if terminated, park while suspended.
    pub async fn checkpoint(&self, pid: Pid) -> TermResult {
        let rx = self.procs().get(pid).map(ProcessRecord::watch);
        let Some(mut rx) = rx else {
            return Ok(());
        };
        loop {
            let state = *rx.borrow_and_update();
            match state {
                RunState::Running => return Ok(()),
                RunState::Terminated(signal) => return Err(Halt::Signaled(signal)),
                RunState::Suspended => {
                    if rx.changed().await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Resolves when `pid` is terminated by a signal; never, otherwise.
    pub async fn terminated(&self, pid: Pid) -> Signal {
        let rx = self.procs().get(pid).map(ProcessRecord::watch);
        let Some(mut rx) = rx else {
            return std::future::pending().await;
        };
        loop {
            let state = *rx.borrow_and_update();
            if let RunState::Terminated(signal) = state {
                return signal;
            }
            if rx.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    // --- terms ---

    pub fn insert_term(&self, def: Arc<Term>, parent: Option<TermId>) -> TermId {
        self.terms().insert(def, parent)
    }

    /// Free a node and its subtree, returning its final state.
    pub fn free_term(&self, id: TermId) -> ExecState {
        self.terms().free(id).unwrap_or_default()
    }

    pub fn term_def(&self, id: TermId) -> Option<Arc<Term>> {
        self.terms().get(id).map(|node| Arc::clone(&node.def))
    }

    pub fn term_state(&self, id: TermId) -> ExecState {
        self.terms()
            .get(id)
            .map(|node| node.state.clone())
            .unwrap_or_default()
    }

    pub fn update_term<R>(&self, id: TermId, f: impl FnOnce(&mut TermNode) -> R) -> Option<R> {
        self.terms().get_mut(id).map(f)
    }

    pub fn live_terms(&self) -> usize {
        self.terms().len()
    }

    /// The nearest Shell or Pipe ancestor is an interactive Shell.
    pub fn is_interactive(&self, id: TermId) -> bool {
        self.terms()
            .find_ancestor(id, |node| matches!(*node.def, Term::Shell(_) | Term::Pipe(_)))
            .is_some_and(|node| matches!(&*node.def, Term::Shell(shell) if shell.interactive))
    }

    pub fn inside_function(&self, id: TermId) -> bool {
        self.terms().ancestors(id).any(|node| node.invokes_function)
    }

    /// While/For ancestors up to the nearest function boundary.
    pub fn enclosing_loops(&self, id: TermId) -> u32 {
        let terms = self.terms();
        let mut count = 0;
        for node in terms.ancestors(id) {
            if node.invokes_function {
                break;
            }
            if matches!(*node.def, Term::While(_) | Term::For(_)) {
                count += 1;
            }
        }
        count
    }

    // --- files ---

    pub fn fd(&self, pid: Pid, fd: u32) -> Result<Arc<OpenFile>, TermError> {
        self.procs()
            .get(pid)
            .and_then(|p| p.fds.get(fd))
            .ok_or(TermError::BadDescriptor(fd))
    }

    /// Open `path`; writing creates a missing regular file.
    pub fn open(&self, path: &str, cwd: &str, mode: OpenMode) -> Result<Arc<OpenFile>, TermError> {
        let node = if mode.writes() {
            self.tree.create(path, cwd)?
        } else {
            self.tree.resolve(path, cwd)?
        };
        OpenFile::open(node, path, mode)
    }

    /// Install descriptors into a process, returning what they replaced.
    pub fn install_fds(&self, pid: Pid, overrides: Vec<(u32, Arc<OpenFile>)>) -> SavedFds {
        let mut procs = self.procs();
        let Some(record) = procs.get_mut(pid) else {
            return Vec::new();
        };
        overrides
            .into_iter()
            .map(|(fd, file)| (fd, record.fds.set(fd, file)))
            .collect()
    }

    pub fn restore_fds(&self, pid: Pid, saved: SavedFds) {
        let mut procs = self.procs();
        let Some(record) = procs.get_mut(pid) else {
            return;
        };
        for (fd, previous) in saved.into_iter().rev() {
            match previous {
                Some(file) => {
                    record.fds.set(fd, file);
                }
                None => {
                    record.fds.remove(fd);
                }
            }
        }
    }

    /// Descriptor table for a new session on the terminal at `tty_path`.
    pub fn session_fds(&self, tty_path: &str) -> Result<FdTable, TermError> {
        let mut fds = FdTable::default();
        fds.set(0, self.open(tty_path, "/", OpenMode::Read)?);
        fds.set(1, self.open(tty_path, "/", OpenMode::Write)?);
        fds.set(2, self.open(tty_path, "/", OpenMode::Write)?);
        Ok(fds)
    }

    /// An anonymous pipe: `(read end, write end)`.
    pub fn create_pipe(&self) -> Result<(Arc<OpenFile>, Arc<OpenFile>), TermError> {
        let node = INode::device(Arc::new(Fifo::new(self.config.fifo_capacity)));
        let n = self.pipes.fetch_add(1, Ordering::Relaxed);
        let path = format!("pipe:[{n}]");
        let reader = OpenFile::open(Arc::clone(&node), path.clone(), OpenMode::Read)?;
        let writer = OpenFile::open(node, path, OpenMode::Write)?;
        Ok((reader, writer))
    }

    // --- levels ---

    async fn worker(&self) -> &WorkerClient {
        self.worker
            .get_or_init(|| async { WorkerClient::spawn() })
            .await
    }

    /// Mount `/dev/level-<name>` once and wait for the worker to create the
    /// level. Returns the device path.
    pub async fn ensure_level(&self, name: &str) -> Result<String, TermError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(TermError::usage(format!("{name}: invalid level name")));
        }
        let path = format!("/dev/level-{name}");
        {
            let mut levels = self.levels.lock().unwrap_or_else(|e| e.into_inner());
            if !levels.contains_key(name) {
                let device = Arc::new(LevelDevice::new(name, self.config.level_queue()));
                self.tree.mount_device(&path, Arc::clone(&device) as Arc<dyn Device>)?;
                levels.insert(name.to_string(), device);
                tracing::debug!(level = name, %path, "mounted level device");
            }
        }
        self.worker().await.ensure_level(name).await?;
        Ok(path)
    }

    pub fn level(&self, name: &str) -> Option<Arc<LevelDevice>> {
        self.levels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Unmount a level. Commands still queued on it fail as detached.
    pub async fn destroy_level(&self, name: &str) -> Result<(), TermError> {
        let device = self
            .levels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(name)
            .ok_or_else(|| TermError::NoSuchFile(format!("/dev/level-{name}")))?;
        device.clear_pending();
        self.tree.remove(&format!("/dev/level-{name}"), "/", false)?;
        self.worker().await.destroy_level(name)?;
        Ok(())
    }

    pub async fn level_names(&self) -> Result<Vec<String>, TermError> {
        self.worker().await.levels().await
    }

    async fn read_lines(file: Arc<OpenFile>, max_lines: usize) -> Result<Vec<String>, TermError> {
        let mut buffer = Vec::new();
        file.read(&mut buffer, max_lines).await?;
        Ok(buffer)
    }

    async fn write_lines(file: Arc<OpenFile>, mut lines: Vec<String>) -> Result<usize, TermError> {
        file.write(&mut lines).await
    }

    /// Write to a descriptor, halting if the process is terminated while
    /// the write is blocked.
    async fn write_fd(&self, pid: Pid, fd: u32, lines: Vec<String>) -> Result<usize, Halt> {
        let file = self.fd(pid, fd)?;
        tokio::select! {
            written = Self::write_lines(file, lines) => match written {
                Ok(n) => Ok(n),
                Err(TermError::BrokenPipe) => Err(Halt::Signaled(Signal::Pipe)),
                Err(e) => Err(e.into()),
            },
            signal = self.terminated(pid) => Err(Halt::Signaled(signal)),
        }
    }
}

#[async_trait]
impl Dispatcher for Os {
    async fn dispatch(&self, pid: Pid, action: Action) -> Result<Ack, Halt> {
        match action {
            Action::Enter { term } => {
                tracing::trace!(%pid, %term, "enter");
                Ok(Ack::Done)
            }
            Action::Exit { term, code, line } => {
                tracing::trace!(%pid, %term, code, "exit");
                if let Some(line) = line {
                    if let Err(halt) = self.write_fd(pid, 2, vec![line]).await {
                        tracing::debug!(%pid, ?halt, "exit line not written");
                    }
                }
                Ok(Ack::Done)
            }
            Action::Read { fd, max_lines, .. } => {
                let file = self.fd(pid, fd)?;
                let max = max_lines.clamp(1, self.config.max_lines_per_read.max(1));
                tokio::select! {
                    lines = Self::read_lines(file, max) => Ok(Ack::Read(lines?)),
                    signal = self.terminated(pid) => Err(Halt::Signaled(signal)),
                }
            }
            Action::Write { fd, lines, .. } => self.write_fd(pid, fd, lines).await.map(Ack::Written),
            Action::Warn { line, .. } => self.write_fd(pid, 2, vec![line]).await.map(Ack::Written),
        }
    }
}
