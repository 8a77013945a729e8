//! floor — Set or remove floor tiles on the current level.

use async_trait::async_trait;

use super::level::{out_of_range, parse_coord, run_on_level};
use crate::device::{ClearWhat, LevelCommand, shift};
use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

const USAGE: &str = "usage: floor [-c] [-r] [-o X,Y] X,Y...";

/// Floor: `floor [-c] [-r] [-o X,Y] X,Y...` on the level in `$LEVEL`.
///
/// `-r` removes the tiles instead of adding them, `-o` shifts every tile,
/// and `-c` clears all tiles. Negative coordinates go after `--`.
pub struct Floor;

#[async_trait]
impl Command for Floor {
    fn name(&self) -> &str {
        "floor"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().boolean("c").boolean("r").string("o")
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let command = parse(&args)?;
        run_on_level(cx, vec![command]).await
    }
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
            what: ClearWhat::Tiles,
        });
    }
    if args.operands.is_empty() {
        return Err(TermError::usage(USAGE));
    }
    let offset = args.string("o").map(parse_coord).transpose()?.unwrap_or((0, 0));
    let tiles = args
        .operands
        .iter()
        .map(|operand| {
            let tile = parse_coord(operand)?;
            shift(tile, offset).map(|_| tile).ok_or_else(|| out_of_range(operand))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LevelCommand::SetTiles {
        tiles,
        enabled: !args.flag("r"),
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(args: &[&str]) -> ParsedArgs {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        ParsedArgs::parse(&args, &Floor.spec())
    }

    #[test]
    fn sets_tiles_with_offset() {
        let command = parse(&parsed(&["-o", "10,-1", "0,0", "1,0"])).unwrap();
        assert_eq!(
            command,
            LevelCommand::SetTiles {
                tiles: vec![(0, 0), (1, 0)],
                enabled: true,
                offset: (10, -1),
            }
        );
    }

    #[test]
    fn removes_tiles() {
        let command = parse(&parsed(&["-r", "--", "-2,3"])).unwrap();
        assert_eq!(
            command,
            LevelCommand::SetTiles {
                tiles: vec![(-2, 3)],
                enabled: false,
                offset: (0, 0),
            }
        );
    }

    #[test]
    fn clear_takes_no_operands() {
        assert_eq!(
            parse(&parsed(&["-c"])).unwrap(),
            LevelCommand::Clear {
                what: ClearWhat::Tiles
            }
        );
        assert!(parse(&parsed(&["-c", "1,1"])).is_err());
    }

    #[test]
    fn rejects_offsets_past_the_grid() {
        let err = parse(&parsed(&["-o", "1,0", "9223372036854775807,0"])).unwrap_err();
        assert_eq!(err.to_string(), "9223372036854775807,0: coordinate out of range");
        assert_eq!(err.exit_code(), 1);
        assert!(parse(&parsed(&["-o", "0,-1", "--", "0,-9223372036854775808"])).is_err());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&parsed(&[])).is_err());
        assert!(parse(&parsed(&["-x", "1,1"])).is_err());
        assert!(parse(&parsed(&["1;1"])).is_err());
        assert!(parse(&parsed(&["1,1", "-o"])).is_err());
    }
}
