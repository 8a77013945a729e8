//! true, false — Exit with a fixed status.

use async_trait::async_trait;

use crate::error::TermResult;
use crate::tools::{Command, CommandKind, ExecContext, ParsedArgs};

pub struct True;

#[async_trait]
impl Command for True {
    fn name(&self) -> &str {
        "true"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    async fn run(&self, _args: ParsedArgs, cx: &ExecContext) -> TermResult {
        cx.set_exit_code(0);
        Ok(())
    }
}

pub struct False;

#[async_trait]
impl Command for False {
    fn name(&self) -> &str {
        "false"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    async fn run(&self, _args: ParsedArgs, cx: &ExecContext) -> TermResult {
        cx.set_exit_code(1);
        Ok(())
    }
}
