//! ls — List directory contents.

use async_trait::async_trait;

use crate::device::DeviceKind;
use crate::error::{TermError, TermResult};
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};
use crate::vfs::INodeKind;

/// Ls: `ls [-l] [-a] [path...]`.
pub struct Ls;

#[async_trait]
impl Command for Ls {
    fn name(&self) -> &str {
        "ls"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Binary
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().boolean("l").boolean("a").boolean("1")
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        let long = args.flag("l");
        let all = args.flag("a");
        let paths = if args.operands.is_empty() {
            vec![".".to_string()]
        } else {
            args.operands.clone()
        };
        let many = paths.len() > 1;

        let mut code = 0;
        for (i, path) in paths.iter().enumerate() {
            let entries = match list(cx, path) {
                Ok(entries) => entries,
                Err(err) => {
                    cx.warn(format!("ls: {err}")).await?;
                    code = 1;
                    continue;
                }
            };
            let mut out = Vec::new();
            if many {
                if i > 0 {
                    out.push(String::new());
                }
                out.push(format!("{path}:"));
            }
            for (name, kind) in entries {
                if !all && name.starts_with('.') {
                    continue;
                }
                out.push(if long {
                    format!("{} {name}", type_char(kind))
                } else {
                    name
                });
            }
            cx.write(out).await?;
        }
        cx.set_exit_code(code);
        Ok(())
    }
}

/// Directory entries, or the path itself for a non-directory.
fn list(cx: &ExecContext, path: &str) -> Result<Vec<(String, INodeKind)>, TermError> {
    let node = cx.resolve(path)?;
    if node.is_dir() {
        cx.os().tree().list(path, &cx.cwd())
    } else {
        Ok(vec![(path.to_string(), node.kind())])
    }
}

fn type_char(kind: INodeKind) -> char {
    match kind {
        INodeKind::Directory => 'd',
        INodeKind::Regular => '-',
        INodeKind::Device(DeviceKind::Fifo) => 'p',
        INodeKind::Device(_) => 'c',
    }
}
