//! What each term variant does when it runs.
//!
//! Composite semantics instantiate their children in the arena, run them
//! through [`run_term`], absorb their loop-control state and free them.
//! Status flows up as `pending` on this node; the driver turns it into the
//! exit code.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;

use super::control_flow::{ExecState, LoopStep};
use super::driver::run_term;
use super::expand::{expand_single, expand_words};
use super::scope::FunctionEntry;
use crate::ast::{
    BinaryDef, BinaryOp, CompoundDef, ForDef, FunctionDef, PipeDef, Redirect, RedirectOp, ShellDef,
    SimpleDef, Term, WhileDef,
};
use crate::error::{Halt, TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, ParsedArgs};
use crate::vfs::{OpenFile, OpenMode};

pub(super) async fn run(cx: &ExecContext) -> TermResult {
    let def = cx.def()?;
    if def.is_background() {
        return background(cx, &def);
    }
    match &*def {
        Term::Simple(simple) => simple_command(cx, simple).await,
        Term::Pipe(pipe) => pipeline(cx, pipe).await,
        Term::Binary(binary) => binary_op(cx, binary).await,
        Term::Compound(compound) => group(cx, compound).await,
        Term::Function(function) => declare_function(cx, function),
        Term::While(def) => while_loop(cx, def).await,
        Term::For(def) => for_loop(cx, def).await,
        Term::Shell(shell) => shell_root(cx, shell).await,
    }
}

/// Instantiate `def` under this node, run it to completion and free it.
///
/// The child's break/continue/return state is absorbed into this node.
async fn run_child(cx: &ExecContext, def: Arc<Term>) -> Result<ExecState, Halt> {
    let child = cx.os().insert_term(def, Some(cx.term));
    run_term(cx.for_term(child)).await;
    let state = cx.os().free_term(child);
    cx.update_state(|own| own.absorb(&state))?;
    cx.checkpoint().await?;
    Ok(state)
}

fn background(cx: &ExecContext, def: &Term) -> TermResult {
    let job = cx.os().spawn_job(cx.pid, &def.to_string())?;
    // Detached: the job's root has no parent, so nothing it does reaches us.
    let node = cx.os().insert_term(Arc::new(def.foreground()), None);
    let jcx = cx.for_process(job, node);
    let os = Arc::clone(cx.os());
    tokio::spawn(async move {
        run_term(jcx).await;
        let state = os.free_term(node);
        tracing::debug!(pid = %job, status = state.status(), "background job finished");
        os.reap(job);
    });
    cx.with_scope(|scope| scope.set_last_background(job))?;
    cx.set_exit_code(0);
    Ok(())
}

// --- simple commands ---

async fn simple_command(cx: &ExecContext, def: &SimpleDef) -> TermResult {
    let (words, assigns) = cx.with_scope(|scope| {
        let words = expand_words(&def.words, scope, cx.pid);
        let assigns: Vec<(String, String)> = def
            .assigns
            .iter()
            .map(|a| (a.name.clone(), expand_single(&a.value, scope, cx.pid)))
            .collect();
        (words, assigns)
    })?;

    let Some((name, args)) = words.split_first() else {
        for (var, value) in assigns {
            cx.with_scope(|scope| scope.set(var, value))??;
        }
        cx.set_exit_code(0);
        return Ok(());
    };

    let overrides = open_redirects(cx, &def.redirects)?;
    let saved = apply_assigns(cx, assigns)?;
    let result = dispatch_command(cx, name, args, overrides).await;
    restore_assigns(cx, saved)?;
    result
}

async fn dispatch_command(
    cx: &ExecContext,
    name: &str,
    args: &[String],
    overrides: Vec<(u32, Arc<OpenFile>)>,
) -> TermResult {
    let function = cx.with_scope(|scope| scope.function(name).cloned())?;
    if let Some(function) = function {
        return with_fds(cx, overrides, invoke_function(cx, function, args.to_vec())).await;
    }
    let Some(command) = cx.os().command(name) else {
        return Err(TermError::CommandNotFound(name.to_string()).into());
    };
    match command.kind() {
        CommandKind::Builtin => with_fds(cx, overrides, run_command(cx, command, args)).await,
        CommandKind::Binary => run_binary(cx, command, args, overrides).await,
    }
}

async fn run_command(cx: &ExecContext, command: Arc<dyn Command>, args: &[String]) -> TermResult {
    let parsed = ParsedArgs::parse(args, &command.spec());
    command.run(parsed, cx).await
}

async fn run_binary(
    cx: &ExecContext,
    command: Arc<dyn Command>,
    args: &[String],
    overrides: Vec<(u32, Arc<OpenFile>)>,
) -> TermResult {
    let child = cx.os().spawn_child(cx.pid, command.name(), overrides)?;
    let result = run_command(&cx.for_process(child, cx.term), command, args).await;
    cx.os().reap(child);
    // A signal sent to the group reached us as well.
    cx.checkpoint().await?;
    result
}

async fn invoke_function(cx: &ExecContext, function: FunctionEntry, args: Vec<String>) -> TermResult {
    cx.os().update_term(cx.term, |node| node.invokes_function = true);
    cx.with_scope(|scope| scope.push_frame(args))?;
    let body = run_child(cx, Arc::clone(&function.body)).await;
    cx.with_scope(|scope| scope.pop_frame())?;
    let body = body?;
    let status = cx.update_state(|own| own.finish_call(body.status()))?;
    cx.set_exit_code(status);
    Ok(())
}

/// Run `fut` with `overrides` installed in this process's descriptor table.
async fn with_fds<F>(cx: &ExecContext, overrides: Vec<(u32, Arc<OpenFile>)>, fut: F) -> TermResult
where
    F: Future<Output = TermResult>,
{
    if overrides.is_empty() {
        return fut.await;
    }
    let saved = cx.os().install_fds(cx.pid, overrides);
    let result = fut.await;
    cx.os().restore_fds(cx.pid, saved);
    result
}

fn open_redirects(cx: &ExecContext, redirects: &[Redirect]) -> Result<Vec<(u32, Arc<OpenFile>)>, Halt> {
    redirects
        .iter()
        .map(|redirect| {
            let target = cx.with_scope(|scope| expand_single(&redirect.target, scope, cx.pid))?;
            let mode = match redirect.op {
                RedirectOp::Read => OpenMode::Read,
                RedirectOp::Write => OpenMode::Write,
                RedirectOp::Append => OpenMode::Append,
            };
            Ok((redirect.fd, cx.open(&target, mode)?))
        })
        .collect()
}

type SavedVars = Vec<(String, Option<String>)>;

/// `NAME=value cmd`: bind for the duration of the command.
fn apply_assigns(cx: &ExecContext, assigns: Vec<(String, String)>) -> Result<SavedVars, Halt> {
    let mut saved = Vec::with_capacity(assigns.len());
    for (var, value) in assigns {
        let previous = cx.with_scope(|scope| {
            let previous = scope.get(&var).map(str::to_string);
            scope.set(var.clone(), value).map(|()| previous)
        })??;
        saved.push((var, previous));
    }
    Ok(saved)
}

fn restore_assigns(cx: &ExecContext, saved: SavedVars) -> TermResult {
    for (var, previous) in saved.into_iter().rev() {
        cx.with_scope(|scope| match previous {
            Some(value) => scope.set(var, value),
            None => scope.unset(&var),
        })??;
    }
    Ok(())
}

// --- composites ---

async fn pipeline(cx: &ExecContext, def: &PipeDef) -> TermResult {
    let count = def.stages.len();
    if count == 0 {
        cx.set_exit_code(0);
        return Ok(());
    }

    let mut pipes = Vec::with_capacity(count - 1);
    for _ in 1..count {
        pipes.push(cx.os().create_pipe()?);
    }

    let mut stages = Vec::with_capacity(count);
    for (i, stage) in def.stages.iter().enumerate() {
        let mut overrides = Vec::new();
        if i > 0 {
            overrides.push((0, Arc::clone(&pipes[i - 1].0)));
        }
        if i + 1 < count {
            overrides.push((1, Arc::clone(&pipes[i].1)));
        }
        let pid = match cx.os().spawn_child(cx.pid, &stage.to_string(), overrides) {
            Ok(pid) => pid,
            Err(err) => {
                for (pid, node) in stages {
                    cx.os().reap(pid);
                    cx.os().free_term(node);
                }
                return Err(err.into());
            }
        };
        let node = cx.os().insert_term(Arc::new(stage.clone()), Some(cx.term));
        stages.push((pid, node));
    }
    // Only the stages hold pipe ends now.
    drop(pipes);

    let runs = stages.iter().map(|&(pid, node)| {
        let scx = cx.for_process(pid, node);
        let os = Arc::clone(cx.os());
        async move {
            run_term(scx).await;
            // Closes this stage's pipe ends: EOF downstream, EPIPE upstream.
            os.reap(pid);
        }
    });
    join_all(runs).await;

    let mut last = ExecState::default();
    for (_, node) in stages {
        last = cx.os().free_term(node);
    }
    cx.set_exit_code(last.status());
    cx.checkpoint().await
}

async fn binary_op(cx: &ExecContext, def: &BinaryDef) -> TermResult {
    let left = run_child(cx, Arc::new((*def.left).clone())).await?;
    let run_right = match def.op {
        BinaryOp::And => left.status() == 0,
        BinaryOp::Or => left.status() != 0,
        BinaryOp::Seq => true,
    };
    if !run_right || cx.state().has_breakers() {
        cx.set_exit_code(left.status());
        return Ok(());
    }
    let right = run_child(cx, Arc::new((*def.right).clone())).await?;
    cx.set_exit_code(right.status());
    Ok(())
}

async fn group(cx: &ExecContext, def: &CompoundDef) -> TermResult {
    let mut status = 0;
    for item in &def.items {
        status = run_child(cx, Arc::new(item.clone())).await?.status();
        if cx.state().has_breakers() {
            break;
        }
    }
    cx.set_exit_code(status);
    Ok(())
}

fn declare_function(cx: &ExecContext, def: &FunctionDef) -> TermResult {
    let mut body = (*def.body).clone();
    body.rebase_source_map();
    let entry = FunctionEntry {
        name: def.name.clone(),
        body: Arc::new(body),
        src: def.src.clone(),
        readonly: false,
    };
    cx.with_scope(|scope| scope.define_function(entry))??;
    cx.set_exit_code(0);
    Ok(())
}

/// Loops pause every `loop_yield_every` iterations, the first included, so
/// the rest of the system (and Ctrl-C) gets a turn.
async fn pause(cx: &ExecContext, iteration: &mut u64) -> TermResult {
    let every = u64::from(cx.config().loop_yield_every.max(1));
    let due = *iteration % every == 0;
    *iteration += 1;
    if due {
        let pause = cx.config().loop_pause();
        if pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(pause).await;
        }
        cx.checkpoint().await?;
    }
    Ok(())
}

/// A guard or body exited through a domain error: the loop ends with its
/// code and no loop control escapes.
fn abort_loop(cx: &ExecContext, failed: &ExecState) -> TermResult {
    cx.update_state(|own| own.clear_breakers())?;
    cx.set_exit_code(failed.status());
    Ok(())
}

async fn while_loop(cx: &ExecContext, def: &WhileDef) -> TermResult {
    let guard = Arc::new((*def.guard).clone());
    let body = Arc::new((*def.body).clone());
    let mut status = 0;
    let mut iteration = 0;
    loop {
        pause(cx, &mut iteration).await?;

        let tested = run_child(cx, Arc::clone(&guard)).await?;
        if tested.errored {
            return abort_loop(cx, &tested);
        }
        match cx.update_state(|own| own.loop_step())? {
            LoopStep::Stop => break,
            LoopStep::Restart => continue,
            LoopStep::Proceed => {}
        }
        if tested.status() != 0 {
            break;
        }

        let ran = run_child(cx, Arc::clone(&body)).await?;
        if ran.errored {
            return abort_loop(cx, &ran);
        }
        status = ran.status();
        if cx.update_state(|own| own.loop_step())? == LoopStep::Stop {
            break;
        }
    }
    cx.set_exit_code(status);
    Ok(())
}

async fn for_loop(cx: &ExecContext, def: &ForDef) -> TermResult {
    let items = cx.with_scope(|scope| expand_words(&def.items, scope, cx.pid))?;
    let body = Arc::new((*def.body).clone());
    let mut status = 0;
    let mut iteration = 0;
    for item in items {
        pause(cx, &mut iteration).await?;
        cx.with_scope(|scope| scope.set(def.var.clone(), item))??;

        let ran = run_child(cx, Arc::clone(&body)).await?;
        if ran.errored {
            return abort_loop(cx, &ran);
        }
        status = ran.status();
        if cx.update_state(|own| own.loop_step())? == LoopStep::Stop {
            break;
        }
    }
    cx.set_exit_code(status);
    Ok(())
}

async fn shell_root(cx: &ExecContext, def: &ShellDef) -> TermResult {
    let body = run_child(cx, Arc::new((*def.body).clone())).await?;
    // Loop control never escapes a shell.
    cx.update_state(|own| own.clear_breakers())?;
    cx.set_exit_code(body.status());
    Ok(())
}
