//! Background jobs, job control signals and Ctrl-C.

mod common;

use std::sync::Arc;
use std::time::Duration;

use burrow_kernel::process::RunState;
use burrow_kernel::{Pid, Signal, Term};
use common::{Shell, concat, sh, word};

/// `{ while true; do true; done; } &`
fn busy_job() -> Term {
    Term::group(vec![Term::while_loop(sh(&["true"]), sh(&["true"]))]).background()
}

async fn start_job(shell: &Shell) -> Pid {
    let (code, _) = shell.run(busy_job()).await;
    assert_eq!(code, 0);
    let job = shell.session.last_background().expect("$! is set");
    assert_eq!(shell.state_of(job), Some(RunState::Running));
    job
}

/// Poll until `pid` is in `state`.
async fn wait_state(shell: &Shell, pid: Pid, state: RunState) {
    for _ in 0..2000 {
        if shell.state_of(pid) == Some(state) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("{pid} never reached {state:?}");
}

#[tokio::test]
async fn background_jobs_get_their_own_group() {
    let shell = Shell::new(false);
    let job = start_job(&shell).await;
    assert_eq!(shell.os().pgid_of(job), Some(job));

    let (_, screen) = shell.run(sh(&["echo", "$!"])).await;
    assert_eq!(screen, vec![job.to_string()]);

    shell.os().signal(job, Signal::Kill).unwrap();
    shell.wait_reaped(job).await;
}

#[tokio::test]
async fn interrupt_stops_the_foreground_only() {
    let shell = Arc::new(Shell::new(true));
    let job = start_job(&shell).await;

    let runner = {
        let shell = Arc::clone(&shell);
        tokio::spawn(async move {
            let forever = Term::while_loop(sh(&["true"]), sh(&["true"]));
            shell.kernel.execute(&shell.session, forever).await
        })
    };
    for _ in 0..2000 {
        if shell.session.foreground().is_some() {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(shell.session.foreground().is_some(), "foreground never started");

    assert!(shell.kernel.interrupt(&shell.session) >= 1);
    let code = runner.await.unwrap().unwrap();
    assert_eq!(code, 130);
    assert_eq!(shell.session.foreground(), None);
    assert_eq!(shell.state_of(job), Some(RunState::Running));

    shell.os().signal(job, Signal::Kill).unwrap();
    shell.wait_reaped(job).await;
}

#[tokio::test]
async fn stop_and_continue_a_job() {
    let shell = Shell::new(false);
    let job = start_job(&shell).await;

    shell.os().signal(job, Signal::Stop).unwrap();
    wait_state(&shell, job, RunState::Suspended).await;

    let (_, screen) = shell.run(sh(&["ps"])).await;
    let row = screen
        .iter()
        .find(|line| line.split_whitespace().next() == Some(job.0.to_string().as_str()))
        .expect("job listed");
    assert!(row.contains(" T "), "{row}");

    shell.os().signal(job, Signal::Cont).unwrap();
    wait_state(&shell, job, RunState::Running).await;

    let (code, screen) = shell.run(sh(&["kill", "$!"])).await;
    assert_eq!(code, 0);
    assert!(screen.is_empty());
    shell.wait_reaped(job).await;
}

#[tokio::test]
async fn kill_a_job_by_group() {
    let shell = Shell::new(false);
    let job = start_job(&shell).await;

    // kill -- -$!
    let term = Term::words(vec![word("kill"), word("--"), concat(&["-", "$!"])]);
    let (code, screen) = shell.run(term).await;
    assert_eq!(code, 0);
    assert!(screen.is_empty(), "{screen:?}");
    shell.wait_reaped(job).await;

    // The group is gone now.
    let (_, screen) = shell
        .run(Term::words(vec![word("kill"), word("--"), concat(&["-", "$!"])]))
        .await;
    assert_eq!(screen, vec![format!("({job}) - No such process")]);
}

#[tokio::test]
async fn background_stdin_is_null() {
    let shell = Shell::new(false);
    shell.session.tty().send_line("for the foreground");
    // { read line; echo "$?" > /tmp/bg; } &
    let job = Term::group(vec![
        sh(&["read", "line"]),
        sh(&["echo", "$?"]).redirect(1, burrow_kernel::ast::RedirectOp::Write, "/tmp/bg"),
    ])
    .background();
    shell.run(job).await;
    let pid = shell.session.last_background().expect("job started");
    shell.wait_reaped(pid).await;
    assert_eq!(shell.os().tree().read_file("/tmp/bg").unwrap(), vec!["1"]);

    // The line is still there for the foreground.
    shell.session.tty().close_input();
    shell.run(sh(&["read", "line"])).await;
    assert_eq!(shell.session.var("line").as_deref(), Some("for the foreground"));
}
