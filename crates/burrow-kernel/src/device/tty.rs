//! The terminal device: `/dev/tty-<n>`.
//!
//! Output lines are queued as [`TtyCommand`]s and drained into a bounded
//! scrollback, `lines_per_update` per tick. Input lines arrive through
//! [`TtyDevice::send_line`] and are handed to blocked readers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::queue::{CommandQueue, QueueConfig};
use super::{Device, DeviceKind};
use crate::error::TermError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TtyCommand {
    Line(String),
    Newline,
    Clear,
    /// Text shown at the start of the current, unfinished line.
    Prompt(String),
}

/// What the terminal shows.
#[derive(Debug, Clone, Default)]
pub struct Scrollback {
    lines: VecDeque<String>,
    partial: String,
    max_lines: usize,
}

impl Scrollback {
    pub fn new(max_lines: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            partial: String::new(),
            max_lines: max_lines.max(1),
        }
    }

    fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    pub fn apply(&mut self, command: TtyCommand) {
        match command {
            TtyCommand::Line(line) => {
                let mut full = std::mem::take(&mut self.partial);
                full.push_str(&line);
                self.push(full);
            }
            TtyCommand::Newline => {
                let full = std::mem::take(&mut self.partial);
                self.push(full);
            }
            TtyCommand::Clear => {
                self.lines.clear();
                self.partial.clear();
            }
            TtyCommand::Prompt(text) => self.partial = text,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn partial(&self) -> &str {
        &self.partial
    }
}

#[derive(Debug, Default)]
struct Input {
    lines: VecDeque<String>,
    closed: bool,
}

#[derive(Debug)]
pub struct TtyDevice {
    session_key: String,
    input: Mutex<Input>,
    input_ready: Notify,
    screen: Arc<Mutex<Scrollback>>,
    output: CommandQueue<TtyCommand>,
}

impl TtyDevice {
    pub fn new(session_key: impl Into<String>, lines_per_update: usize, tick: std::time::Duration, scrollback: usize) -> Self {
        let screen = Arc::new(Mutex::new(Scrollback::new(scrollback)));
        let target = Arc::clone(&screen);
        let output = CommandQueue::new(
            QueueConfig {
                max_per_drain: lines_per_update,
                tick,
            },
            move |command| {
                target
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .apply(command);
            },
        );
        Self {
            session_key: session_key.into(),
            input: Mutex::new(Input::default()),
            input_ready: Notify::new(),
            screen,
            output,
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    /// A line typed by the user.
    pub fn send_line(&self, line: impl Into<String>) {
        self.input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .lines
            .push_back(line.into());
        self.input_ready.notify_waiters();
    }

    /// After the buffered lines, readers see end of file.
    pub fn close_input(&self) {
        self.input.lock().unwrap_or_else(|e| e.into_inner()).closed = true;
        self.input_ready.notify_waiters();
    }

    /// Queue output commands and wait for them to reach the screen.
    pub async fn run_all(&self, commands: Vec<TtyCommand>) -> Result<(), TermError> {
        self.output
            .run_all(commands)
            .await
            .map_err(|_| TermError::DeviceDetached(format!("tty of {}", self.session_key)))
    }

    /// Wait until everything queued so far has been drained.
    pub async fn flush(&self) {
        // A cleared queue has nothing left to flush either.
        let _ = self.output.run_all(Vec::new()).await;
    }

    pub async fn set_prompt(&self, prompt: impl Into<String>) -> Result<(), TermError> {
        self.run_all(vec![TtyCommand::Prompt(prompt.into())]).await
    }

    /// Ctrl-C: forget typed-ahead input and undrained output.
    /// Returns the number of output commands dropped.
    pub fn clear_pending(&self) -> usize {
        self.input
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .lines
            .clear();
        self.output.clear()
    }

    pub fn screen(&self) -> Scrollback {
        self.screen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn screen_lines(&self) -> Vec<String> {
        self.screen().lines().map(str::to_string).collect()
    }

    /// Return and forget the lines shown so far.
    pub fn take_screen(&self) -> Vec<String> {
        let mut screen = self.screen.lock().unwrap_or_else(|e| e.into_inner());
        screen.lines.drain(..).collect()
    }
}

#[async_trait]
impl Device for TtyDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Tty
    }

    fn read_blocked(&self) -> bool {
        true
    }

    fn write_blocked(&self) -> bool {
        true
    }

    async fn read(&self, buffer: &mut Vec<String>, max_lines: usize, _offset: usize) -> Result<usize, TermError> {
        loop {
            let notified = self.input_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut input = self.input.lock().unwrap_or_else(|e| e.into_inner());
                if !input.lines.is_empty() {
                    let take = max_lines.max(1).min(input.lines.len());
                    buffer.extend(input.lines.drain(..take));
                    return Ok(take);
                }
                if input.closed {
                    return Ok(0);
                }
            }
            notified.await;
        }
    }

    async fn write(&self, buffer: &mut Vec<String>, _offset: usize) -> Result<usize, TermError> {
        let lines: Vec<TtyCommand> = buffer.drain(..).map(TtyCommand::Line).collect();
        let count = lines.len();
        // Output dropped by Ctrl-C still counts as written.
        let _ = self.output.run_all(lines).await;
        Ok(count)
    }

    fn as_tty(&self) -> Option<&TtyDevice> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tty() -> Arc<TtyDevice> {
        Arc::new(TtyDevice::new("s1", 2, Duration::from_millis(1), 3))
    }

    #[tokio::test]
    async fn writes_reach_screen_in_order() {
        let tty = tty();
        let mut lines = vec!["a".to_string(), "b".into(), "c".into()];
        assert_eq!(tty.write(&mut lines, 0).await.unwrap(), 3);
        assert_eq!(tty.screen_lines(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn scrollback_is_bounded() {
        let tty = tty();
        let mut lines: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        tty.write(&mut lines, 0).await.unwrap();
        assert_eq!(tty.screen_lines(), vec!["2", "3", "4"]);
    }

    #[tokio::test]
    async fn prompt_prefixes_next_line() {
        let tty = tty();
        tty.set_prompt("$ ").await.unwrap();
        assert_eq!(tty.screen().partial(), "$ ");
        tty.run_all(vec![TtyCommand::Line("ls".into())]).await.unwrap();
        assert_eq!(tty.screen_lines(), vec!["$ ls"]);
    }

    #[tokio::test]
    async fn read_blocks_until_input_arrives() {
        let tty = tty();
        let reader = {
            let tty = Arc::clone(&tty);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let n = tty.read(&mut buf, 10, 0).await.unwrap();
                (n, buf)
            })
        };
        tokio::task::yield_now().await;
        tty.send_line("hello");
        let (n, buf) = reader.await.unwrap();
        assert_eq!(n, 1);
        assert_eq!(buf, vec!["hello"]);
    }

    #[tokio::test]
    async fn closed_input_reads_eof() {
        let tty = tty();
        tty.send_line("last");
        tty.close_input();
        let mut buf = Vec::new();
        assert_eq!(tty.read(&mut buf, 10, 0).await.unwrap(), 1);
        assert_eq!(tty.read(&mut buf, 10, 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn clear_pending_drops_typed_ahead_input() {
        let tty = tty();
        tty.send_line("stale");
        tty.clear_pending();
        tty.close_input();
        let mut buf = Vec::new();
        assert_eq!(tty.read(&mut buf, 10, 0).await.unwrap(), 0);
    }
}
