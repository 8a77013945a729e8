//! read — Read a line from stdin into variables.

use async_trait::async_trait;

use crate::error::TermResult;
use crate::interpreter::expand::split_fields;
use crate::tools::{Command, CommandKind, ExecContext, OptSpec, ParsedArgs};

/// Read: `read [-p prompt] [name...]`.
///
/// One name takes the whole line; with several, each takes a field and the
/// last takes the rest. No name means `REPLY`. End of file exits 1.
pub struct Read;

#[async_trait]
impl Command for Read {
    fn name(&self) -> &str {
        "read"
    }

    fn kind(&self) -> CommandKind {
        CommandKind::Builtin
    }

    fn spec(&self) -> OptSpec {
        OptSpec::new().string("p")
    }

    async fn run(&self, args: ParsedArgs, cx: &ExecContext) -> TermResult {
        if let Some(prompt) = args.string("p") {
            if cx.is_interactive() {
                show_prompt(cx, prompt).await?;
            }
        }

        let mut buffer = Vec::new();
        if !cx.read(1, &mut buffer).await? {
            cx.set_exit_code(1);
            return Ok(());
        }
        let line = buffer.into_iter().next().unwrap_or_default();

        let names = if args.operands.is_empty() {
            vec!["REPLY".to_string()]
        } else {
            args.operands.clone()
        };
        let values = assign_fields(&line, names.len());
        cx.with_scope(|scope| {
            names
                .into_iter()
                .zip(values)
                .try_for_each(|(name, value)| scope.set(name, value))
        })??;
        cx.set_exit_code(0);
        Ok(())
    }
}

/// Prompts go to the terminal on stdin, if there is one.
async fn show_prompt(cx: &ExecContext, prompt: &str) -> TermResult {
    let file = cx.os().fd(cx.pid, 0)?;
    let Some(device) = file.inode().as_device().cloned() else {
        return Ok(());
    };
    if let Some(tty) = device.as_tty() {
        tty.set_prompt(prompt).await?;
    }
    Ok(())
}

/// Split `line` over `count` variables, the last taking the remainder.
fn assign_fields(line: &str, count: usize) -> Vec<String> {
    if count <= 1 {
        return vec![line.to_string()];
    }
    let mut fields = split_fields(line);
    if fields.len() > count {
        fields.truncate(count - 1);
        let mut tail = line.trim();
        for field in &fields {
            tail = tail
                .strip_prefix(field.as_str())
                .map(str::trim_start)
                .unwrap_or(tail);
        }
        fields.push(tail.to_string());
    }
    fields.resize(count, String::new());
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_name_keeps_the_line() {
        assert_eq!(assign_fields("  a b  ", 1), vec!["  a b  "]);
    }

    #[test]
    fn last_name_takes_the_rest() {
        assert_eq!(assign_fields("a b  c d", 2), vec!["a", "b  c d"]);
    }

    #[test]
    fn missing_fields_are_empty() {
        assert_eq!(assign_fields("a", 3), vec!["a", "", ""]);
    }
}
