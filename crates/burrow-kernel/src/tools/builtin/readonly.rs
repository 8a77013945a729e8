//! readonly — Protect variables and functions from change.

use async_trait::async_trait;

use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

/// Readonly: `readonly name[=value]...`, `readonly -f name...`.
pub struct Readonly;

#[async_trait]
impl Command for Readonly {
    fn name(&self) -> &str {
        "readonly"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().boolean("f")
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        if args.operands.is_empty() {
            return Err(TermError::usage("usage: readonly [-f] name[=value]...").into());
        }

        if args.flag("f") {
            let missing = cx.with_scope(|scope| {
                args.operands
                    .iter()
                    .filter(|name| !scope.mark_function_readonly(name))
                    .cloned()
                    .collect::<Vec<_>>()
            })?;
            for name in &missing {
                cx.warn(format!("readonly: {name}: not a function")).await?;
            }
            cx.set_exit_code(i32::from(!missing.is_empty()));
            return Ok(());
        }

        cx.with_scope(|scope| {
            for operand in &args.operands {
                match operand.split_once('=') {
                    Some((name, value)) => {
                        scope.set(name, value)?;
                        scope.mark_readonly(name);
                    }
                    None => scope.mark_readonly(operand.as_str()),
                }
            }
            Ok::<_, TermError>(())
        })??;
        cx.set_exit_code(0);
        Ok(())
    }
}
