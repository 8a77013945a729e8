//! cd — Change the working directory.

use async_trait::async_trait;

use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, ParsedArgs};

/// Cd: `cd [dir]`, `cd -`. With no operand, goes to `$HOME` or the
/// configured home directory.
pub struct Cd;

#[async_trait]
impl Command for Cd {
    fn name(&self) -> &str {
        "cd"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let target = match args.operands.as_slice() {
            [] => cx.var("HOME").unwrap_or_else(|| cx.config().home.clone()),
            [dash] if dash == "-" => cx
                .var("OLDPWD")
                .ok_or_else(|| TermError::usage("cd: OLDPWD not set"))?,
            [dir] => dir.clone(),
            _ => return Err(TermError::usage("cd: too many arguments").into()),
        };

        let node = cx.resolve(&target)?;
        if !node.is_dir() {
            return Err(TermError::NotADirectory(target).into());
        }
        let previous = cx.cwd();
        let next = cx.absolute(&target);
        cx.with_scope(|scope| {
            scope.set_cwd(next.clone());
            scope.set("OLDPWD", previous)?;
            scope.set("PWD", next)
        })??;
        cx.set_exit_code(0);
        Ok(())
    }
}
