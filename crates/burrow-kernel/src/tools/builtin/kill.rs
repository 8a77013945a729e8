//! kill — Send signals to processes.

use async_trait::async_trait;

use crate::error::{Halt, TermError, TermResult};
use crate::process::{Pid, Signal};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

/// Kill: `kill [-s SIG | -N | --SIG | --SIGSIG] pid...`, `kill -l`.
///
/// Signals default to TERM. Every resolvable pid gets every signal; a pid
/// with no process is reported and skipped without failing the command.
/// A negative pid (after `--`) names a process group.
pub struct Kill;

#[async_trait]
impl Command for Kill {
    fn name(&self) -> &str {
        "kill"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    fn spec(&self) -> OptSpec {
        let mut spec = OptSpec::new().boolean("l").string("s");
        for signal in Signal::ALL {
            spec = spec
                .boolean(&signal.number().to_string())
                .boolean(signal.short_name())
                .boolean(&signal.to_string());
        }
        spec
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        if args.flag("l") {
            return cx.write(Signal::listing()).await;
        }
        if args.malformed {
            return Err(Halt::exit_with(1, "kill: usage: kill [-s sigspec | -n signum | -sigspec] pid"));
        }
        if let Some(unknown) = args.unknown.first() {
            return Err(TermError::usage(format!("kill: {unknown}: invalid signal specification")).into());
        }

        let signals = signals(&args)?;
        for target in targets(&args.operands) {
            match target {
                Target::Process(pid) => {
                    if cx.os().with_process(pid, |_| ()).is_none() {
                        cx.warn(TermError::NoSuchProcess(pid).to_string()).await?;
                        continue;
                    }
                    for &signal in &signals {
                        // Gone between signals: nothing left to deliver to.
                        let _ = cx.os().signal(pid, signal);
                    }
                }
                Target::Group(pgid) => {
                    for &signal in &signals {
                        if cx.os().signal_group(pgid, signal) == 0 {
                            cx.warn(TermError::NoSuchProcess(pgid).to_string()).await?;
                            break;
                        }
                    }
                }
            }
        }
        cx.set_exit_code(0);
        // We may have signalled ourselves.
        cx.checkpoint().await
    }
}

/// Requested signals in number order, TERM if none.
fn signals(args: &ParsedArgs) -> Result<Vec<Signal>, TermError> {
    let mut signals: Vec<Signal> = args
        .flags
        .iter()
        .filter(|flag| *flag != "l")
        .filter_map(|flag| flag.parse::<Signal>().ok())
        .collect();
    if let Some(spec) = args.string("s") {
        signals.push(spec.parse::<Signal>().map_err(|e| TermError::usage(format!("kill: {e}")))?);
    }
    signals.sort_by_key(|signal| signal.number());
    signals.dedup();
    if signals.is_empty() {
        signals.push(Signal::Term);
    }
    Ok(signals)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Process(Pid),
    Group(Pid),
}

/// Operands that are not pids are ignored.
fn targets(operands: &[String]) -> Vec<Target> {
    operands
        .iter()
        .filter_map(|operand| match operand.strip_prefix('-') {
            Some(group) => group.parse::<u32>().ok().filter(|n| *n > 0).map(|n| Target::Group(Pid(n))),
            None => operand.parse::<u32>().ok().filter(|n| *n > 0).map(|n| Target::Process(Pid(n))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parsed(args: &[&str]) -> ParsedArgs {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        ParsedArgs::parse(&args, &Kill.spec())
    }

    #[rstest]
    #[case::default(&["12"], vec![Signal::Term])]
    #[case::numeric(&["-9", "12"], vec![Signal::Kill])]
    #[case::long(&["--SIGHUP", "12"], vec![Signal::Hup])]
    #[case::short(&["--INT", "12"], vec![Signal::Int])]
    #[case::dash_s(&["-s", "STOP", "12"], vec![Signal::Stop])]
    #[case::several(&["-1", "--SIGKILL", "12"], vec![Signal::Hup, Signal::Kill])]
    fn resolves_signals(#[case] args: &[&str], #[case] expected: Vec<Signal>) {
        let parsed = parsed(args);
        assert!(parsed.unknown.is_empty());
        assert_eq!(signals(&parsed).unwrap(), expected);
    }

    #[test]
    fn bad_signal_name_is_rejected() {
        assert!(signals(&parsed(&["-s", "NOPE", "1"])).is_err());
    }

    #[test]
    fn targets_skip_junk_and_read_groups() {
        let operands: Vec<String> = ["5", "abc", "0", "-7"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            targets(&operands),
            vec![Target::Process(Pid(5)), Target::Group(Pid(7))]
        );
    }
}
