//! pwd — Print the working directory.

use async_trait::async_trait;

use crate::error::TermResult;
use crate::tools::{Command, CommandKind, ExecContext, ParsedArgs};

pub struct Pwd;

#[async_trait]
impl Command for Pwd {
    fn name(&self) -> &str {
        "pwd"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    async fn run(&self, _args: ParsedArgs, cx: &ExecContext) -> TermResult {
        cx.write([cx.cwd()]).await
    }
}
