//! Pipe inode connecting pipeline stages.
//!
//! A bounded line buffer with reader and writer counts maintained by open
//! file descriptions. Reads block while the buffer is empty and a writer
//! remains; once every writer has closed, reads drain what is left and then
//! report end of file. Writes block while the buffer is full and fail with
//! broken pipe once every reader has closed.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::fd::OpenMode;
use crate::device::{Device, DeviceKind};
use crate::error::TermError;

#[derive(Debug, Default)]
struct State {
    lines: VecDeque<String>,
    readers: usize,
    writers: usize,
}

#[derive(Debug)]
pub struct Fifo {
    state: Mutex<State>,
    readable: Notify,
    writable: Notify,
    capacity: usize,
}

impl Fifo {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            readable: Notify::new(),
            writable: Notify::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn buffered(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).lines.len()
    }
}

#[async_trait]
impl Device for Fifo {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Fifo
    }

    fn read_blocked(&self) -> bool {
        true
    }

    fn write_blocked(&self) -> bool {
        true
    }

    async fn read(&self, buffer: &mut Vec<String>, max_lines: usize, _offset: usize) -> Result<usize, TermError> {
        loop {
            let notified = self.readable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                if !state.lines.is_empty() {
                    let take = max_lines.max(1).min(state.lines.len());
                    buffer.extend(state.lines.drain(..take));
                    self.writable.notify_waiters();
                    return Ok(take);
                }
                if state.writers == 0 {
                    return Ok(0);
                }
            }
            notified.await;
        }
    }

    async fn write(&self, buffer: &mut Vec<String>, _offset: usize) -> Result<usize, TermError> {
        let mut written = 0;
        while !buffer.is_empty() {
            let notified = self.writable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
                if state.readers == 0 {
                    return Err(TermError::BrokenPipe);
                }
                let room = self.capacity.saturating_sub(state.lines.len());
                if room > 0 {
                    let take = room.min(buffer.len());
                    state.lines.extend(buffer.drain(..take));
                    written += take;
                    self.readable.notify_waiters();
                    continue;
                }
            }
            notified.await;
        }
        Ok(written)
    }

    fn open(&self, mode: OpenMode) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if mode.reads() {
            state.readers += 1;
        }
        if mode.writes() {
            state.writers += 1;
        }
    }

    fn close(&self, mode: OpenMode) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if mode.reads() {
            state.readers = state.readers.saturating_sub(1);
        }
        if mode.writes() {
            state.writers = state.writers.saturating_sub(1);
        }
        // Blocked peers must re-check the counts.
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn read_after_last_writer_closes_is_eof() {
        let fifo = Fifo::new(8);
        fifo.open(OpenMode::Read);
        fifo.open(OpenMode::Write);
        let mut lines = vec!["a".to_string(), "b".into()];
        assert_eq!(fifo.write(&mut lines, 0).await.unwrap(), 2);
        fifo.close(OpenMode::Write);

        let mut buf = Vec::new();
        assert_eq!(fifo.read(&mut buf, 10, 0).await.unwrap(), 2);
        assert_eq!(fifo.read(&mut buf, 10, 0).await.unwrap(), 0);
        assert_eq!(buf, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn write_without_readers_is_broken_pipe() {
        let fifo = Fifo::new(8);
        fifo.open(OpenMode::Write);
        let mut lines = vec!["x".to_string()];
        assert_eq!(
            fifo.write(&mut lines, 0).await.unwrap_err(),
            TermError::BrokenPipe
        );
    }

    #[tokio::test]
    async fn full_pipe_blocks_writer_until_reader_drains() {
        let fifo = Arc::new(Fifo::new(2));
        fifo.open(OpenMode::Read);
        fifo.open(OpenMode::Write);

        let writer = {
            let fifo = Arc::clone(&fifo);
            tokio::spawn(async move {
                let mut lines: Vec<String> = (0..5).map(|i| i.to_string()).collect();
                fifo.write(&mut lines, 0).await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(fifo.buffered(), 2);

        let mut buf = Vec::new();
        while buf.len() < 5 {
            fifo.read(&mut buf, 1, 0).await.unwrap();
        }
        assert_eq!(writer.await.unwrap().unwrap(), 5);
        assert_eq!(buf, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn reader_closing_wakes_blocked_writer() {
        let fifo = Arc::new(Fifo::new(1));
        fifo.open(OpenMode::Read);
        fifo.open(OpenMode::Write);
        let writer = {
            let fifo = Arc::clone(&fifo);
            tokio::spawn(async move {
                let mut lines = vec!["a".to_string(), "b".into()];
                fifo.write(&mut lines, 0).await
            })
        };
        tokio::task::yield_now().await;
        fifo.close(OpenMode::Read);
        assert_eq!(writer.await.unwrap().unwrap_err(), TermError::BrokenPipe);
    }
}
