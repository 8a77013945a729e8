//! seq — Print a sequence of integers.

use async_trait::async_trait;

use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

/// Seq: `seq [first [step]] last`.
pub struct Seq;

/// Lines per write, so a downstream reader can start early.
const CHUNK: usize = 100;

#[async_trait]
impl Command for Seq {
    fn name(&self) -> &str {
        "seq"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().stop_early()
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        // Leading negative numbers parse as numeric options; put them back.
        let mut numbers: Vec<String> = args.unknown.iter().map(|n| format!("-{n}")).collect();
        numbers.extend(args.operands.iter().cloned());
        let (first, step, last) = bounds(&numbers)?;

        let mut chunk = Vec::with_capacity(CHUNK);
        let mut next = Some(first);
        while let Some(n) = next {
            if (step > 0 && n > last) || (step < 0 && n < last) {
                break;
            }
            chunk.push(n.to_string());
            if chunk.len() == CHUNK {
                cx.write(std::mem::take(&mut chunk)).await?;
            }
            // Stepping past the integer range ends the sequence.
            next = n.checked_add(step);
        }
        if !chunk.is_empty() {
            cx.write(chunk).await?;
        }
        Ok(())
    }
}

fn bounds(numbers: &[String]) -> Result<(i64, i64, i64), TermError> {
    let parsed: Result<Vec<i64>, _> = numbers.iter().map(|n| n.parse::<i64>()).collect();
    let usage = || TermError::usage("usage: seq [first [step]] last");
    let parsed = parsed.map_err(|_| usage())?;
    let (first, step, last) = match parsed.as_slice() {
        [last] => (1, 1, *last),
        [first, last] => (*first, 1, *last),
        [first, step, last] => (*first, *step, *last),
        _ => return Err(usage()),
    };
    if step == 0 {
        return Err(TermError::usage("seq: zero step"));
    }
    Ok((first, step, last))
}
