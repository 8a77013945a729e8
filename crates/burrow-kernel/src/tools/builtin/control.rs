//! break, continue, return — Loop and function control.
//!
//! Each sets a depth (or return code) on the term running it; enclosing
//! terms absorb it on the way up until a loop or function boundary
//! consumes it.

use async_trait::async_trait;

use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, ParsedArgs};

/// Loop count operand: defaults to 1, must be positive.
fn loop_count(name: &str, args: &ParsedArgs) -> Result<u32, TermError> {
    match args.operands.as_slice() {
        [] => Ok(1),
        [n] => n
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| TermError::usage(format!("{name}: {n}: loop count out of range"))),
        _ => Err(TermError::usage(format!("{name}: too many arguments"))),
    }
}

/// How many loops `name` may unwind, clamped to those enclosing it.
fn depth(name: &str, args: &ParsedArgs, cx: &ExecContext) -> Result<u32, TermError> {
    let loops = cx.enclosing_loops();
    if loops == 0 {
        return Err(TermError::usage(format!(
            "{name}: only meaningful in a `for' or `while' loop"
        )));
    }
    Ok(loop_count(name, args)?.min(loops))
}

pub struct Break;

#[async_trait]
impl Command for Break {
    fn name(&self) -> &str {
        "break"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let n = depth("break", &args, cx)?;
        cx.update_state(|state| {
            state.break_depth = n;
            state.pending = Some(0);
        })
    }
}

pub struct Continue;

#[async_trait]
impl Command for Continue {
    fn name(&self) -> &str {
        "continue"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let n = depth("continue", &args, cx)?;
        cx.update_state(|state| {
            state.continue_depth = n;
            state.pending = Some(0);
        })
    }
}

/// Return: `return [n]`, defaulting to `$?`.
pub struct Return;

#[async_trait]
impl Command for Return {
    fn name(&self) -> &str {
        "return"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        if !cx.inside_function() {
            return Err(TermError::usage("return: can only `return' from a function").into());
        }
        let code = match args.operands.as_slice() {
            [] => cx.with_scope(|scope| scope.last_exit())?,
            [n] => n
                .parse::<i32>()
                .map_err(|_| TermError::usage(format!("return: {n}: numeric argument required")))?,
            _ => return Err(TermError::usage("return: too many arguments").into()),
        };
        cx.update_state(|state| {
            state.return_code = Some(code);
            state.pending = Some(code);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parsed(args: &[&str]) -> ParsedArgs {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        ParsedArgs::parse(&args, &Break.spec())
    }

    #[rstest]
    #[case::default(&[], 1)]
    #[case::explicit(&["3"], 3)]
    fn counts(#[case] args: &[&str], #[case] expected: u32) {
        assert_eq!(loop_count("break", &parsed(args)).unwrap(), expected);
    }

    #[rstest]
    #[case::zero(&["0"])]
    #[case::word(&["x"])]
    #[case::two(&["1", "2"])]
    fn rejects(#[case] args: &[&str]) {
        assert!(loop_count("break", &parsed(args)).is_err());
    }
}
