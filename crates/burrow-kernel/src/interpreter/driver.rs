//! The driver envelope around every term's semantics.
//!
//! `run_term` emits `Enter`, runs the semantics, and emits exactly one
//! `Exit`, whatever way the semantics ended: normally, by asking to exit,
//! through a domain error, by signal, by an unexpected error or a panic.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures::FutureExt;

use super::action::Action;
use super::semantics;
use crate::error::Halt;
use crate::tools::ExecContext;

/// The boxed future of one term run. Boxing breaks the type-level
/// recursion between composite semantics and their children.
pub type TermFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// How a run ended, as reported in the exit action.
struct Outcome {
    code: i32,
    line: Option<String>,
    errored: bool,
}

pub fn run_term(cx: ExecContext) -> TermFuture {
    Box::pin(async move {
        let kind = cx.def().map(|def| def.key()).unwrap_or("term");
        if let Err(halt) = cx.emit(Action::Enter { term: cx.term }).await {
            tracing::warn!(term = %cx.term, ?halt, "enter not acknowledged");
        }

        let result = AssertUnwindSafe(semantics::run(&cx)).catch_unwind().await;
        let outcome = match result {
            Ok(Ok(())) => Outcome {
                code: cx.state().status(),
                line: None,
                errored: false,
            },
            Ok(Err(Halt::Exit { code, line })) => Outcome {
                code,
                line,
                errored: false,
            },
            Ok(Err(Halt::Error(err))) => {
                tracing::warn!(term = %cx.term, kind, error = %err, "term failed");
                Outcome {
                    code: err.exit_code(),
                    line: Some(err.to_string()),
                    errored: true,
                }
            }
            Ok(Err(Halt::Signaled(signal))) => {
                tracing::debug!(term = %cx.term, pid = %cx.pid, %signal, "halted by signal");
                Outcome {
                    code: signal.exit_code(),
                    line: None,
                    errored: false,
                }
            }
            Ok(Err(Halt::Unexpected(err))) => {
                tracing::error!(term = %cx.term, kind, error = ?err, "unexpected error");
                unexpected(kind)
            }
            Err(_panic) => {
                tracing::error!(term = %cx.term, kind, "term panicked");
                unexpected(kind)
            }
        };
        finish(&cx, outcome).await;
    })
}

fn unexpected(kind: &str) -> Outcome {
    Outcome {
        code: 2,
        line: Some(format!("unexpected error in term '{kind}'")),
        errored: false,
    }
}

async fn finish(cx: &ExecContext, outcome: Outcome) {
    let Outcome { code, line, errored } = outcome;
    let recorded = cx.update_state(|state| {
        debug_assert!(state.exit_code.is_none(), "exit code set twice");
        state.exit_code = Some(code);
        state.errored = errored;
    });
    if recorded.is_err() {
        tracing::warn!(term = %cx.term, "exiting term is no longer in the arena");
    }
    // Background jobs and pipeline stages update their own scope copy.
    let _ = cx.with_scope(|scope| scope.set_last_exit(code));

    if let Err(halt) = cx
        .emit(Action::Exit {
            term: cx.term,
            code,
            line,
        })
        .await
    {
        tracing::warn!(term = %cx.term, ?halt, "exit not acknowledged");
    }
}
