//! echo — Print arguments to stdout.

use async_trait::async_trait;

use crate::error::TermResult;
use crate::tools::escape::interpret_escapes;
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

/// Echo: `echo [-n] [-e] args...`.
pub struct Echo;

#[async_trait]
impl Command for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().boolean("n").boolean("e").stop_early()
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let mut text = args.operands.join(" ");
        // Anything we don't recognise was meant to be printed.
        if !args.unknown.is_empty() {
            let raw: Vec<String> = args.unknown.iter().map(|u| format!("-{u}")).collect();
            text = if text.is_empty() {
                raw.join(" ")
            } else {
                format!("{} {text}", raw.join(" "))
            };
        }
        if args.flag("e") {
            text = interpret_escapes(&text);
        }
        if args.flag("n") && text.is_empty() {
            return Ok(());
        }
        cx.write(text.split('\n').map(str::to_string)).await
    }
}
