//! wc — Count bytes or lines.

use async_trait::async_trait;

use crate::error::{Halt, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

/// Wc: `wc [-l] [path...]`.
///
/// Standard input prints `<n>`; each file prints `<path>: <n>`. A missing
/// file is reported and skipped, and the exit status becomes 1.
pub struct Wc;

#[async_trait]
impl Command for Wc {
    fn name(&self) -> &str {
        "wc"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().boolean("l")
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let lines_only = args.flag("l");

        if args.operands.is_empty() {
            let lines = cx.read_all().await?;
            let n = if lines_only {
                lines.len()
            } else {
                stream_bytes(&lines)
            };
            return cx.write([n.to_string()]).await;
        }

        let mut code = 0;
        for path in &args.operands {
            match cx.read_path(path).await {
                Ok(lines) => {
                    let n = if lines_only {
                        lines.len()
                    } else {
                        file_bytes(&lines)
                    };
                    cx.write([format!("{path}: {n}")]).await?;
                }
                Err(Halt::Error(err)) => {
                    cx.warn(err.to_string()).await?;
                    code = 1;
                }
                Err(halt) => return Err(halt),
            }
        }
        cx.set_exit_code(code);
        Ok(())
    }
}

/// Lines read from a stream each had a newline, plus the closing one.
fn stream_bytes(lines: &[String]) -> usize {
    lines.iter().map(|line| line.len() + 1).sum::<usize>() + 1
}

/// A stored file is its lines joined by newlines.
fn file_bytes(lines: &[String]) -> usize {
    lines
        .iter()
        .map(|line| line.len() + 1)
        .sum::<usize>()
        .saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stream_counts_every_newline() {
        assert_eq!(stream_bytes(&lines(&["a", "bb"])), 6);
        assert_eq!(stream_bytes(&[]), 1);
    }

    #[test]
    fn file_counts_joined_text() {
        assert_eq!(file_bytes(&lines(&["a", "bb"])), 4);
        assert_eq!(file_bytes(&[]), 0);
    }
}
