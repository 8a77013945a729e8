//! cat — Concatenate files, or copy stdin, to stdout.

use async_trait::async_trait;

use crate::error::{Halt, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, ParsedArgs};

/// Cat: `cat [path...]`. `-` means stdin.
pub struct Cat;

#[async_trait]
impl Command for Cat {
    fn name(&self) -> &str {
        "cat"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        if args.operands.is_empty() {
            return copy_stdin(cx).await;
        }
        let mut code = 0;
        for path in &args.operands {
            if path == "-" {
                copy_stdin(cx).await?;
                continue;
            }
            match cx.read_path(path).await {
                Ok(lines) => cx.write(lines).await?,
                Err(Halt::Error(err)) => {
                    cx.warn(format!("cat: {err}")).await?;
                    code = 1;
                }
                Err(halt) => return Err(halt),
            }
        }
        cx.set_exit_code(code);
        Ok(())
    }
}

/// Stream stdin to stdout a chunk at a time, so pipelines interleave.
async fn copy_stdin(cx: &ExecContext) -> TermResult {
    let max = cx.config().max_lines_per_read;
    let mut buffer = Vec::new();
    while cx.read(max, &mut buffer).await? {
        cx.write(buffer.drain(..)).await?;
    }
    Ok(())
}
