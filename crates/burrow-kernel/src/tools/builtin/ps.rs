//! ps — List processes.

use async_trait::async_trait;

use crate::error::TermResult;
use crate::process::{ProcessMeta, RunState};
use crate::tools::{Command, CommandKind, ExecContext, ParsedArgs};

/// Ps: one row per process, pid order.
pub struct Ps;

#[async_trait]
impl Command for Ps {
    fn name(&self) -> &str {
        "ps"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    async fn run(&self, _args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let mut rows = vec![format!("{:>5} {:>5} {:>5} {} COMMAND", "PID", "PPID", "PGID", "S")];
        rows.extend(cx.os().process_metas().iter().map(row));
        cx.write(rows).await
    }
}

fn row(meta: &ProcessMeta) -> String {
    let state = match meta.state {
        RunState::Running => 'R',
        RunState::Suspended => 'T',
        RunState::Terminated(_) => 'X',
    };
    let parent = meta.parent.map(|p| p.to_string()).unwrap_or_else(|| "0".to_string());
    format!(
        "{:>5} {:>5} {:>5} {} {}",
        meta.pid, parent, meta.pgid, state, meta.command
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Pid;

    #[test]
    fn rows_are_aligned() {
        let meta = ProcessMeta {
            pid: Pid(12),
            parent: Some(Pid(3)),
            pgid: Pid(12),
            state: RunState::Suspended,
            command: "sleep 5".into(),
        };
        assert_eq!(row(&meta), "   12     3    12 T sleep 5");
    }
}
