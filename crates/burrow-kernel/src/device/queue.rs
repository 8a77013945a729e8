//! Batched command queue for device inodes.
//!
//! Callers enqueue commands followed by a resolve marker and await the
//! marker. A single drain task applies at most `max_per_drain` items per
//! tick, in FIFO order, and reschedules itself while items remain. This
//! keeps bursts of submissions from outrunning whatever applies them.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub max_per_drain: usize,
    pub tick: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_per_drain: 40,
            tick: Duration::from_millis(1),
        }
    }
}

/// The queue was cleared before this submission drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("command queue cleared before drain")]
pub struct QueueCleared;

enum Queued<C> {
    Command(C),
    Resolve(oneshot::Sender<()>),
}

struct QueueState<C> {
    items: VecDeque<Queued<C>>,
    draining: bool,
}

type Apply<C> = Arc<dyn Fn(C) + Send + Sync>;

pub struct CommandQueue<C> {
    state: Arc<Mutex<QueueState<C>>>,
    config: QueueConfig,
    apply: Apply<C>,
}

impl<C: Send + 'static> std::fmt::Debug for CommandQueue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("pending", &self.pending())
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Send + 'static> CommandQueue<C> {
    /// `apply` runs once per drained command, on the drain task.
    pub fn new(config: QueueConfig, apply: impl Fn(C) + Send + Sync + 'static) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::new(),
                draining: false,
            })),
            config: QueueConfig {
                max_per_drain: config.max_per_drain.max(1),
                ..config
            },
            apply: Arc::new(apply),
        }
    }

    /// Enqueue one command and wait until it has been applied.
    pub async fn run(&self, command: C) -> Result<(), QueueCleared> {
        self.run_all(vec![command]).await
    }

    /// Enqueue commands and wait until all of them have been applied.
    ///
    /// An empty batch still waits for everything queued before it.
    pub async fn run_all(&self, commands: Vec<C>) -> Result<(), QueueCleared> {
        self.submit(commands).await.map_err(|_| QueueCleared)
    }

    /// Enqueue without waiting; the receiver fires once the batch drains.
    pub fn submit(&self, commands: Vec<C>) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state
                .items
                .extend(commands.into_iter().map(Queued::Command));
            state.items.push_back(Queued::Resolve(tx));
        }
        self.schedule();
        rx
    }

    /// Drop everything pending. Waiters on dropped markers see
    /// [`QueueCleared`]. Returns the number of commands dropped.
    pub fn clear(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let dropped = state
            .items
            .iter()
            .filter(|item| matches!(item, Queued::Command(_)))
            .count();
        state.items.clear();
        dropped
    }

    /// Commands still waiting to be applied.
    pub fn pending(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .items
            .iter()
            .filter(|item| matches!(item, Queued::Command(_)))
            .count()
    }

    fn schedule(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if state.draining {
                return;
            }
            state.draining = true;
        }
        let state = Arc::clone(&self.state);
        let apply = Arc::clone(&self.apply);
        let config = self.config;
        tokio::spawn(drain(state, apply, config));
    }
}

/// Take the next batch: up to `max` commands, plus every resolve marker
/// interleaved with them and any markers directly following the last one.
fn take_batch<C>(items: &mut VecDeque<Queued<C>>, max: usize) -> Vec<Queued<C>> {
    let mut batch = Vec::new();
    let mut commands = 0;
    while let Some(front) = items.front() {
        if matches!(front, Queued::Command(_)) {
            if commands == max {
                break;
            }
            commands += 1;
        }
        if let Some(item) = items.pop_front() {
            batch.push(item);
        }
    }
    batch
}

async fn drain<C>(state: Arc<Mutex<QueueState<C>>>, apply: Apply<C>, config: QueueConfig) {
    loop {
        tokio::time::sleep(config.tick).await;
        let batch = {
            let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
            take_batch(&mut state.items, config.max_per_drain)
        };
        tracing::trace!(items = batch.len(), "drain cycle");
        for item in batch {
            match item {
                Queued::Command(command) => {
                    // A panicking command is dropped; the queue must keep draining.
                    if catch_unwind(AssertUnwindSafe(|| apply(command))).is_err() {
                        tracing::error!("device command panicked, dropped");
                    }
                }
                Queued::Resolve(tx) => {
                    // The waiter may have given up; nothing to do then.
                    let _ = tx.send(());
                }
            }
        }
        let mut guard = state.lock().unwrap_or_else(|e| e.into_inner());
        if guard.items.is_empty() {
            guard.draining = false;
            return;
        }
    }
}
