//! printf — Formatted output.

use async_trait::async_trait;

use crate::error::{Halt, TermResult};
use crate::tools::escape::interpret_escapes;
use crate::tools::format::sprintf;
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

const USAGE: &str = "usage: printf [-v var] format [arguments]";

/// Printf: `printf [-v var] format [arguments]`.
///
/// Backslash escapes are interpreted in the formatted text, which is then
/// written one line per `\n`. With `-v` the text is assigned instead.
pub struct Printf;

#[async_trait]
impl Command for Printf {
    fn name(&self) -> &str {
        "printf"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().string("v").stop_early()
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        if args.malformed || !args.unknown.is_empty() {
            return Err(Halt::exit_with(1, USAGE));
        }
        let Some((format, rest)) = args.operands.split_first() else {
            // Nothing to print is fine; nothing to assign is not.
            if args.string("v").is_some() {
                return Err(Halt::exit_with(1, USAGE));
            }
            cx.set_exit_code(0);
            return Ok(());
        };

        let text = match sprintf(format, rest) {
            Ok(text) => interpret_escapes(&text),
            Err(err) => return Err(Halt::exit_with(1, err.message())),
        };

        match args.string("v") {
            Some(var) => {
                let var = var.to_string();
                cx.with_scope(|scope| scope.set(var, text))??;
            }
            None => cx.write(output_lines(&text)).await?,
        }
        cx.set_exit_code(0);
        Ok(())
    }
}

/// One line per `\n`; a final newline ends the last line rather than
/// starting an empty one.
fn output_lines(text: &str) -> Vec<String> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    body.split('\n').map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_newlines() {
        assert_eq!(output_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(output_lines("a\n\n"), vec!["a", ""]);
        assert_eq!(output_lines("no newline"), vec!["no newline"]);
    }
}
