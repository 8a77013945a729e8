//! Shared plumbing for the level binaries, `floor` and `wall`.

use std::sync::Arc;

use crate::device::{Coord, Device, LevelCommand};
use crate::error::{TermError, TermResult};
use crate::tools::ExecContext;

/// The variable naming the level the binaries act on.
pub(super) const LEVEL_VAR: &str = "LEVEL";

/// `X,Y` with integer coordinates.
pub(super) fn parse_coord(text: &str) -> Result<Coord, TermError> {
    let bad = || TermError::usage(format!("{text}: expected X,Y"));
    let (x, y) = text.split_once(',').ok_or_else(bad)?;
    let x = x.trim().parse::<i64>().map_err(|_| bad())?;
    let y = y.trim().parse::<i64>().map_err(|_| bad())?;
    Ok((x, y))
}

/// An operand that leaves the grid once the offset is applied.
pub(super) fn out_of_range(operand: &str) -> TermError {
    TermError::usage(format!("{operand}: coordinate out of range"))
}

/// The device `$LEVEL` points at. A bare name means `/dev/level-<name>`.
fn level_device(cx: &ExecContext) -> Result<Arc<dyn Device>, TermError> {
    let not_level = || TermError::NotALevelDevice(LEVEL_VAR.to_string());
    let value = cx.var(LEVEL_VAR).filter(|v| !v.is_empty()).ok_or_else(not_level)?;
    let path = if value.contains('/') {
        value
    } else {
        format!("/dev/level-{value}")
    };
    let node = cx.resolve(&path).map_err(|_| not_level())?;
    let device = node.as_device().cloned().ok_or_else(not_level)?;
    if device.as_level().is_none() {
        return Err(not_level());
    }
    Ok(device)
}

/// Queue `commands` on the `$LEVEL` device and wait until they are applied.
pub(super) async fn run_on_level(cx: &ExecContext, commands: Vec<LevelCommand>) -> TermResult {
    let device = level_device(cx)?;
    let Some(level) = device.as_level() else {
        return Err(TermError::NotALevelDevice(LEVEL_VAR.to_string()).into());
    };
    cx.checkpoint().await?;
    tracing::debug!(level = level.level_key(), count = commands.len(), "level commands");
    level.run_all(commands).await?;
    cx.checkpoint().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("1,2", (1, 2))]
    #[case::negative("-3,-4", (-3, -4))]
    #[case::spaced(" 5 , 6", (5, 6))]
    fn parses(#[case] text: &str, #[case] expected: Coord) {
        assert_eq!(parse_coord(text).unwrap(), expected);
    }

    #[rstest]
    #[case::missing_comma("12")]
    #[case::not_numbers("a,b")]
    #[case::empty("")]
    fn rejects(#[case] text: &str) {
        assert!(parse_coord(text).is_err());
    }
}
