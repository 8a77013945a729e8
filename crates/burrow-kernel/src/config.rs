//! Kernel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::QueueConfig;

/// Configuration for initializing a kernel.
///
/// Every field has a default, so a config file only needs the fields it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Name of this kernel (shown in logs).
    pub name: String,
    /// Working directory of new sessions; created on startup.
    pub home: String,
    /// Upper bound on lines moved by one read.
    pub max_lines_per_read: usize,
    /// Loops pause every this many iterations.
    pub loop_yield_every: u32,
    /// Length of the loop pause, in milliseconds.
    pub loop_pause_ms: u64,
    /// Delay before each device drain cycle, in milliseconds.
    pub device_tick_ms: u64,
    /// Level commands applied per drain cycle.
    pub level_commands_per_drain: usize,
    /// Terminal output commands applied per drain cycle.
    pub tty_lines_per_update: usize,
    /// Lines kept by each terminal.
    pub scrollback_lines: usize,
    /// Lines a pipe buffers before writers block.
    pub fifo_capacity: usize,
    /// Largest pid before allocation wraps.
    pub max_pid: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            home: "/home/user".to_string(),
            max_lines_per_read: 1000,
            loop_yield_every: 10,
            loop_pause_ms: 10,
            device_tick_ms: 1,
            level_commands_per_drain: 40,
            tty_lines_per_update: 100,
            scrollback_lines: 500,
            fifo_capacity: 1000,
            max_pid: 32768,
        }
    }
}

impl KernelConfig {
    /// No pauses: for tests and batch runs.
    pub fn fast() -> Self {
        Self {
            name: "fast".to_string(),
            loop_pause_ms: 0,
            device_tick_ms: 0,
            ..Self::default()
        }
    }

    pub fn loop_pause(&self) -> Duration {
        Duration::from_millis(self.loop_pause_ms)
    }

    pub fn device_tick(&self) -> Duration {
        Duration::from_millis(self.device_tick_ms)
    }

    pub fn level_queue(&self) -> QueueConfig {
        QueueConfig {
            max_per_drain: self.level_commands_per_drain,
            tick: self.device_tick(),
        }
    }
}
