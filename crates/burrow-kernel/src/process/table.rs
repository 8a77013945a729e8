//! The process table.

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::watch;

use super::signal::{Disposition, Signal};
use crate::interpreter::Scope;
use crate::vfs::FdTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque id the dispatcher uses to correlate a process across pid reuse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessKey(String);

impl ProcessKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run state a process observes at its checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Suspended,
    Terminated(Signal),
}

/// What to create.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    pub parent: Option<Pid>,
    /// `None` starts a new group led by the new process.
    pub pgid: Option<Pid>,
    pub session: Option<String>,
    pub interactive: bool,
    pub command: String,
    pub fds: FdTable,
    pub scope: Scope,
}

#[derive(Debug)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub key: ProcessKey,
    pub parent: Option<Pid>,
    pub pgid: Pid,
    pub session: Option<String>,
    pub interactive: bool,
    pub command: String,
    pub fds: FdTable,
    pub scope: Scope,
    state: watch::Sender<RunState>,
}

impl ProcessRecord {
    pub fn run_state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Receiver for waiting on run-state changes.
    pub fn watch(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    /// Apply a signal's disposition. A terminated process stays terminated.
    pub fn deliver(&self, signal: Signal) {
        self.state.send_modify(|state| {
            if matches!(state, RunState::Terminated(_)) {
                return;
            }
            match signal.disposition() {
                Disposition::Terminate => *state = RunState::Terminated(signal),
                Disposition::Suspend => *state = RunState::Suspended,
                Disposition::Resume => *state = RunState::Running,
                Disposition::Ignore => {}
            }
        });
    }
}

/// Summary row, as `ps` shows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessMeta {
    pub pid: Pid,
    pub parent: Option<Pid>,
    pub pgid: Pid,
    pub state: RunState,
    pub command: String,
}

#[derive(Debug)]
pub struct ProcessTable {
    procs: BTreeMap<Pid, ProcessRecord>,
    next_pid: u32,
    max_pid: u32,
    spawned: u64,
}

impl ProcessTable {
    pub fn new(max_pid: u32) -> Self {
        Self {
            procs: BTreeMap::new(),
            next_pid: 1,
            max_pid: max_pid.max(2),
            spawned: 0,
        }
    }

    /// Next free pid, counting upwards and wrapping; `None` when full.
    fn allocate(&mut self) -> Option<Pid> {
        for _ in 0..self.max_pid {
            let candidate = Pid(self.next_pid);
            self.next_pid = if self.next_pid >= self.max_pid {
                1
            } else {
                self.next_pid + 1
            };
            if !self.procs.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    pub fn spawn(&mut self, opts: SpawnOptions) -> Option<Pid> {
        let pid = self.allocate()?;
        self.spawned += 1;
        let (state, _) = watch::channel(RunState::Running);
        let record = ProcessRecord {
            pid,
            key: ProcessKey(format!("proc-{}-{}", pid.0, self.spawned)),
            parent: opts.parent,
            pgid: opts.pgid.unwrap_or(pid),
            session: opts.session,
            interactive: opts.interactive,
            command: opts.command,
            fds: opts.fds,
            scope: opts.scope,
            state,
        };
        tracing::debug!(pid = %pid, pgid = %record.pgid, command = %record.command, "spawn");
        self.procs.insert(pid, record);
        Some(pid)
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessRecord> {
        self.procs.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut ProcessRecord> {
        self.procs.get_mut(&pid)
    }

    /// Remove a finished process, freeing its pid.
    pub fn reap(&mut self, pid: Pid) -> Option<ProcessRecord> {
        let record = self.procs.remove(&pid);
        if record.is_some() {
            tracing::debug!(pid = %pid, "reap");
        }
        record
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.procs.contains_key(&pid)
    }

    pub fn group(&self, pgid: Pid) -> Vec<Pid> {
        self.procs
            .values()
            .filter(|p| p.pgid == pgid)
            .map(|p| p.pid)
            .collect()
    }

    /// Deliver to one process; false if it does not exist.
    pub fn signal(&self, pid: Pid, signal: Signal) -> bool {
        match self.procs.get(&pid) {
            Some(record) => {
                tracing::debug!(pid = %pid, signal = %signal, "deliver");
                record.deliver(signal);
                true
            }
            None => false,
        }
    }

    /// Deliver to every member of a group; returns how many were reached.
    pub fn signal_group(&self, pgid: Pid, signal: Signal) -> usize {
        self.group(pgid)
            .into_iter()
            .filter(|pid| self.signal(*pid, signal))
            .count()
    }

    pub fn metas(&self) -> Vec<ProcessMeta> {
        self.procs
            .values()
            .map(|p| ProcessMeta {
                pid: p.pid,
                parent: p.parent,
                pgid: p.pgid,
                state: p.run_state(),
                command: p.command.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(pgid: Option<Pid>) -> SpawnOptions {
        SpawnOptions {
            parent: None,
            pgid,
            session: None,
            interactive: false,
            command: "test".into(),
            fds: FdTable::default(),
            scope: Scope::default(),
        }
    }

    #[test]
    fn pids_are_not_reused_until_reaped() {
        let mut table = ProcessTable::new(3);
        let a = table.spawn(opts(None)).unwrap();
        let b = table.spawn(opts(None)).unwrap();
        let c = table.spawn(opts(None)).unwrap();
        assert_eq!((a, b, c), (Pid(1), Pid(2), Pid(3)));
        assert!(table.spawn(opts(None)).is_none());

        table.reap(b);
        assert_eq!(table.spawn(opts(None)), Some(Pid(2)));
    }

    #[test]
    fn keys_differ_across_pid_reuse() {
        let mut table = ProcessTable::new(2);
        let a = table.spawn(opts(None)).unwrap();
        let first = table.get(a).unwrap().key.clone();
        table.reap(a);
        table.spawn(opts(None)).unwrap();
        let b = table.spawn(opts(None)).unwrap();
        assert_eq!(a, b);
        assert_ne!(table.get(b).unwrap().key, first);
    }

    #[test]
    fn group_delivery_reaches_every_member() {
        let mut table = ProcessTable::new(100);
        let leader = table.spawn(opts(None)).unwrap();
        let member = table.spawn(opts(Some(leader))).unwrap();
        let outsider = table.spawn(opts(None)).unwrap();

        assert_eq!(table.signal_group(leader, Signal::Int), 2);
        assert_eq!(
            table.get(member).unwrap().run_state(),
            RunState::Terminated(Signal::Int)
        );
        assert_eq!(table.get(outsider).unwrap().run_state(), RunState::Running);
    }

    #[test]
    fn stop_and_continue() {
        let mut table = ProcessTable::new(10);
        let pid = table.spawn(opts(None)).unwrap();
        table.signal(pid, Signal::Tstp);
        assert_eq!(table.get(pid).unwrap().run_state(), RunState::Suspended);
        table.signal(pid, Signal::Winch);
        assert_eq!(table.get(pid).unwrap().run_state(), RunState::Suspended);
        table.signal(pid, Signal::Cont);
        assert_eq!(table.get(pid).unwrap().run_state(), RunState::Running);
        table.signal(pid, Signal::Kill);
        table.signal(pid, Signal::Cont);
        assert_eq!(
            table.get(pid).unwrap().run_state(),
            RunState::Terminated(Signal::Kill)
        );
    }

    #[test]
    fn signal_to_missing_pid_reports_false() {
        let table = ProcessTable::new(10);
        assert!(!table.signal(Pid(99999), Signal::Term));
    }
}
