//! Device inodes.
//!
//! A device is a file-tree leaf whose reads and writes are implemented by
//! code rather than stored lines. Devices that drive something outside the
//! interpreter (a level, a terminal) batch their effects through a
//! [`CommandQueue`].

mod level;
mod null;
mod queue;
mod tty;

pub use level::{ClearWhat, Coord, LevelCommand, LevelDevice, LevelState, WallSeg, shift};
pub use null::NullDevice;
pub use queue::{CommandQueue, QueueCleared, QueueConfig};
pub use tty::{Scrollback, TtyCommand, TtyDevice};

use async_trait::async_trait;

use crate::error::TermError;
use crate::vfs::OpenMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    Null,
    Fifo,
    Tty,
    Level,
}

/// Line-oriented device operations.
///
/// `read` appends up to `max_lines` lines to `buffer` and returns how many it
/// produced; 0 means end of file. `write` consumes lines from the front of
/// `buffer` and returns how many it accepted.
#[async_trait]
pub trait Device: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> DeviceKind;

    /// Whether a read may suspend the caller.
    fn read_blocked(&self) -> bool {
        false
    }

    /// Whether a write may suspend the caller.
    fn write_blocked(&self) -> bool {
        false
    }

    async fn read(
        &self,
        buffer: &mut Vec<String>,
        max_lines: usize,
        offset: usize,
    ) -> Result<usize, TermError>;

    async fn write(&self, buffer: &mut Vec<String>, offset: usize) -> Result<usize, TermError>;

    /// An open file description was created on this device.
    fn open(&self, _mode: OpenMode) {}

    /// An open file description on this device was dropped.
    fn close(&self, _mode: OpenMode) {}

    fn as_level(&self) -> Option<&LevelDevice> {
        None
    }

    fn as_tty(&self) -> Option<&TtyDevice> {
        None
    }
}
