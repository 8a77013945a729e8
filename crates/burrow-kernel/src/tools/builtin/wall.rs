//! wall — Toggle wall segments on the current level.

use async_trait::async_trait;

use super::level::{out_of_range, parse_coord, run_on_level};
use crate::device::{ClearWhat, LevelCommand, WallSeg};
use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

const USAGE: &str = "usage: wall [-c] [-o X,Y] X1,Y1:X2,Y2...";

/// Wall: `wall [-c] [-o X,Y] X1,Y1:X2,Y2...` on the level in `$LEVEL`.
///
/// Each segment is added if absent and removed if present.
pub struct Wall;

#[async_trait]
impl Command for Wall {
    fn name(&self) -> &str {
        "wall"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().boolean("c").string("o")
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let command = parse(&args)?;
        run_on_level(cx, vec![command]).await
    }
}

fn parse_segment(text: &str) -> Result<WallSeg, TermError> {
    let (a, b) = text
        .split_once(':')
        .ok_or_else(|| TermError::usage(format!("{text}: expected X1,Y1:X2,Y2")))?;
    Ok(WallSeg::new(parse_coord(a)?, parse_coord(b)?))
}

fn parse(args: &ParsedArgs) -> Result<LevelCommand, TermError> {
    if args.malformed || !args.unknown.is_empty() {
        return Err(TermError::usage(USAGE));
    }
    if args.flag("c") {
        if !args.operands.is_empty() {
            return Err(TermError::usage(USAGE));
        }
        return Ok(LevelCommand::Clear {
            what: ClearWhat::Walls,
        });
    }
    if args.operands.is_empty() {
        return Err(TermError::usage(USAGE));
    }
    let offset = args.string("o").map(parse_coord).transpose()?.unwrap_or((0, 0));
    let walls = args
        .operands
        .iter()
        .map(|operand| {
            let wall = parse_segment(operand)?;
            wall.shifted(offset).map(|_| wall).ok_or_else(|| out_of_range(operand))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LevelCommand::ToggleWalls { walls, offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(args: &[&str]) -> ParsedArgs {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        ParsedArgs::parse(&args, &Wall.spec())
    }

    #[test]
    fn segments_are_normalised() {
        let command = parse(&parsed(&["1,0:0,0", "-o", "2,2"])).unwrap();
        assert_eq!(
            command,
            LevelCommand::ToggleWalls {
                walls: vec![WallSeg::new((0, 0), (1, 0))],
                offset: (2, 2),
            }
        );
    }

    #[test]
    fn clear_walls() {
        assert_eq!(
            parse(&parsed(&["-c"])).unwrap(),
            LevelCommand::Clear {
                what: ClearWhat::Walls
            }
        );
    }

    #[test]
    fn rejects_offsets_past_the_grid() {
        let err = parse(&parsed(&["-o", "0,1", "0,0:0,9223372036854775807"])).unwrap_err();
        assert_eq!(err.to_string(), "0,0:0,9223372036854775807: coordinate out of range");
    }

    #[test]
    fn rejects_bad_segments() {
        assert!(parse(&parsed(&["0,0"])).is_err());
        assert!(parse(&parsed(&["0,0:x,1"])).is_err());
        assert!(parse(&parsed(&[])).is_err());
    }
}
