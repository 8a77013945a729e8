//! rm — Remove files and directories.

use async_trait::async_trait;

use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

/// Rm: `rm [-r] [-f] path...`.
pub struct Rm;

#[async_trait]
impl Command for Rm {
    fn name(&self) -> &str {
        "rm"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().boolean("r").boolean("R").boolean("f")
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let recursive = args.flag("r") || args.flag("R");
        let force = args.flag("f");
        if args.operands.is_empty() && !force {
            return Err(TermError::usage("usage: rm [-r] [-f] path...").into());
        }

        let cwd = cx.cwd();
        let mut code = 0;
        for path in &args.operands {
            let result = match cx.resolve(path) {
                Ok(node) if node.is_dir() && !recursive => Err(TermError::IsADirectory(path.clone())),
                Ok(_) => cx.os().tree().remove(path, &cwd, recursive),
                Err(err) => Err(err),
            };
            match result {
                Ok(()) => {}
                Err(TermError::NoSuchFile(_)) if force => {}
                Err(err) => {
                    cx.warn(format!("rm: {err}")).await?;
                    code = 1;
                }
            }
        }
        cx.set_exit_code(code);
        Ok(())
    }
}
