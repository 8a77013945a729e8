//! sleep — Wait for a number of seconds.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Halt, TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, ParsedArgs};

/// Sleep: `sleep seconds`. Fractions are allowed.
pub struct Sleep;

#[async_trait]
impl Command for Sleep {
    fn name(&self) -> &str {
        "sleep"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let seconds = match args.operands.as_slice() {
            [value] => value
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s >= 0.0),
            _ => None,
        };
        let Some(seconds) = seconds else {
            return Err(TermError::usage("usage: sleep seconds").into());
        };

        cx.checkpoint().await?;
        tokio::select! {
            () = tokio::time::sleep(Duration::from_secs_f64(seconds)) => {}
            signal = cx.os().terminated(cx.pid) => return Err(Halt::Signaled(signal)),
        }
        cx.checkpoint().await
    }
}
