//! The level device: `/dev/level-<name>`.
//!
//! Shell commands mutate a level's tiles and walls by queueing
//! [`LevelCommand`]s on the device. Reading the device gives immediate EOF;
//! writes are swallowed.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::queue::{CommandQueue, QueueConfig};
use super::{Device, DeviceKind};
use crate::error::TermError;

pub type Coord = (i64, i64);

/// `coord` moved by `offset`, or `None` if either axis overflows.
pub fn shift(coord: Coord, offset: Coord) -> Option<Coord> {
    Some((coord.0.checked_add(offset.0)?, coord.1.checked_add(offset.1)?))
}

/// An undirected wall segment between two grid points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WallSeg {
    pub from: Coord,
    pub to: Coord,
}

impl WallSeg {
    /// Endpoints are stored in sorted order so `a:b` and `b:a` coincide.
    pub fn new(a: Coord, b: Coord) -> Self {
        if a <= b {
            Self { from: a, to: b }
        } else {
            Self { from: b, to: a }
        }
    }

    /// Both endpoints moved by `offset`, or `None` on overflow.
    pub fn shifted(self, offset: Coord) -> Option<Self> {
        Some(WallSeg::new(shift(self.from, offset)?, shift(self.to, offset)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClearWhat {
    Tiles,
    Walls,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", rename_all = "kebab-case")]
pub enum LevelCommand {
    Clear {
        what: ClearWhat,
    },
    SetTiles {
        tiles: Vec<Coord>,
        enabled: bool,
        #[serde(default)]
        offset: Coord,
    },
    ToggleWalls {
        walls: Vec<WallSeg>,
        #[serde(default)]
        offset: Coord,
    },
}

/// Tiles and walls of one level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelState {
    pub tiles: BTreeSet<Coord>,
    pub walls: BTreeSet<WallSeg>,
}

impl LevelState {
    pub fn apply(&mut self, command: LevelCommand) {
        match command {
            LevelCommand::Clear { what } => {
                if matches!(what, ClearWhat::Tiles | ClearWhat::All) {
                    self.tiles.clear();
                }
                if matches!(what, ClearWhat::Walls | ClearWhat::All) {
                    self.walls.clear();
                }
            }
            LevelCommand::SetTiles {
                tiles,
                enabled,
                offset,
            } => {
                for tile in tiles {
                    let Some(tile) = shift(tile, offset) else {
                        tracing::warn!(?tile, ?offset, "tile out of range, skipped");
                        continue;
                    };
                    if enabled {
                        self.tiles.insert(tile);
                    } else {
                        self.tiles.remove(&tile);
                    }
                }
            }
            LevelCommand::ToggleWalls { walls, offset } => {
                for wall in walls {
                    let Some(wall) = wall.shifted(offset) else {
                        tracing::warn!(?wall, ?offset, "wall out of range, skipped");
                        continue;
                    };
                    if !self.walls.remove(&wall) {
                        self.walls.insert(wall);
                    }
                }
            }
        }
    }
}

#[derive(Debug)]
pub struct LevelDevice {
    level_key: String,
    state: Arc<Mutex<LevelState>>,
    queue: CommandQueue<LevelCommand>,
}

impl LevelDevice {
    pub fn new(level_key: impl Into<String>, config: QueueConfig) -> Self {
        let state = Arc::new(Mutex::new(LevelState::default()));
        let target = Arc::clone(&state);
        let queue = CommandQueue::new(config, move |command| {
            target
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .apply(command);
        });
        Self {
            level_key: level_key.into(),
            state,
            queue,
        }
    }

    pub fn level_key(&self) -> &str {
        &self.level_key
    }

    /// Queue a command and wait for it to be applied.
    pub async fn run(&self, command: LevelCommand) -> Result<(), TermError> {
        self.queue
            .run(command)
            .await
            .map_err(|_| TermError::DeviceDetached(format!("level-{}", self.level_key)))
    }

    pub async fn run_all(&self, commands: Vec<LevelCommand>) -> Result<(), TermError> {
        self.queue
            .run_all(commands)
            .await
            .map_err(|_| TermError::DeviceDetached(format!("level-{}", self.level_key)))
    }

    /// Drop commands that have not drained yet.
    pub fn clear_pending(&self) -> usize {
        self.queue.clear()
    }

    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    pub fn snapshot(&self) -> LevelState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Device for LevelDevice {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Level
    }

    async fn read(&self, _buffer: &mut Vec<String>, _max: usize, _offset: usize) -> Result<usize, TermError> {
        Ok(0)
    }

    async fn write(&self, buffer: &mut Vec<String>, _offset: usize) -> Result<usize, TermError> {
        Ok(buffer.drain(..).count())
    }

    fn as_level(&self) -> Option<&LevelDevice> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> LevelDevice {
        LevelDevice::new("test", QueueConfig::default())
    }

    #[tokio::test]
    async fn set_tiles_then_clear_leaves_no_tiles() {
        let level = device();
        level
            .run(LevelCommand::SetTiles {
                tiles: vec![(0, 0), (1, 0)],
                enabled: true,
                offset: (0, 0),
            })
            .await
            .unwrap();
        assert_eq!(level.snapshot().tiles.len(), 2);

        level
            .run(LevelCommand::Clear {
                what: ClearWhat::Tiles,
            })
            .await
            .unwrap();
        assert!(level.snapshot().tiles.is_empty());
    }

    #[tokio::test]
    async fn offset_applies_to_every_tile() {
        let level = device();
        level
            .run(LevelCommand::SetTiles {
                tiles: vec![(0, 0), (-1, 2)],
                enabled: true,
                offset: (10, -5),
            })
            .await
            .unwrap();
        let tiles: Vec<Coord> = level.snapshot().tiles.into_iter().collect();
        assert_eq!(tiles, vec![(9, -3), (10, -5)]);
    }

    #[test]
    fn walls_toggle_regardless_of_direction() {
        let mut state = LevelState::default();
        state.apply(LevelCommand::ToggleWalls {
            walls: vec![WallSeg::new((0, 0), (0, 1))],
            offset: (0, 0),
        });
        assert_eq!(state.walls.len(), 1);
        state.apply(LevelCommand::ToggleWalls {
            walls: vec![WallSeg::new((0, 1), (0, 0))],
            offset: (0, 0),
        });
        assert!(state.walls.is_empty());
    }

    #[test]
    fn overflowing_offsets_are_skipped() {
        let mut state = LevelState::default();
        state.apply(LevelCommand::SetTiles {
            tiles: vec![(i64::MAX, 0), (2, 0)],
            enabled: true,
            offset: (1, 0),
        });
        assert_eq!(state.tiles.clone().into_iter().collect::<Vec<_>>(), vec![(3, 0)]);

        state.apply(LevelCommand::ToggleWalls {
            walls: vec![WallSeg::new((0, i64::MIN), (0, 0))],
            offset: (0, -1),
        });
        assert!(state.walls.is_empty());
    }

    #[tokio::test]
    async fn device_keeps_draining_after_an_out_of_range_command() {
        let level = device();
        level
            .run(LevelCommand::SetTiles {
                tiles: vec![(i64::MAX, 0)],
                enabled: true,
                offset: (1, 0),
            })
            .await
            .unwrap();
        level
            .run(LevelCommand::SetTiles {
                tiles: vec![(0, 0)],
                enabled: true,
                offset: (0, 0),
            })
            .await
            .unwrap();
        assert_eq!(level.snapshot().tiles.len(), 1);
        assert_eq!(level.pending(), 0);
    }

    #[test]
    fn clear_all_keeps_nothing() {
        let mut state = LevelState::default();
        state.tiles.insert((1, 1));
        state.walls.insert(WallSeg::new((0, 0), (1, 0)));
        state.apply(LevelCommand::Clear { what: ClearWhat::Walls });
        assert_eq!(state.tiles.len(), 1);
        state.apply(LevelCommand::Clear { what: ClearWhat::All });
        assert_eq!(state, LevelState::default());
    }

    #[test]
    fn commands_use_key_tag() {
        let json = serde_json::to_value(LevelCommand::Clear { what: ClearWhat::All }).unwrap();
        assert_eq!(json, serde_json::json!({"key": "clear", "what": "all"}));
    }

    #[tokio::test]
    async fn reads_are_immediate_eof() {
        let level = device();
        let mut buf = Vec::new();
        assert_eq!(level.read(&mut buf, 10, 0).await.unwrap(), 0);
        let mut lines = vec!["ignored".to_string()];
        assert_eq!(level.write(&mut lines, 0).await.unwrap(), 1);
        assert!(lines.is_empty());
    }
}
