//! mkdir — Create directories.

use async_trait::async_trait;

use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

/// Mkdir: `mkdir [-p] path...`.
pub struct Mkdir;

#[async_trait]
impl Command for Mkdir {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().boolean("p")
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        if args.operands.is_empty() {
            return Err(TermError::usage("usage: mkdir [-p] directory...").into());
        }
        let parents = args.flag("p");
        let cwd = cx.cwd();
        let mut code = 0;
        for path in &args.operands {
            if let Err(err) = cx.os().tree().mkdir(path, &cwd, parents) {
                cx.warn(format!("mkdir: {err}")).await?;
                code = 1;
            }
        }
        cx.set_exit_code(code);
        Ok(())
    }
}
