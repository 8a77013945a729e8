//! getopts-style argument parsing.
//!
//! - `-abc` is three short options; a short string option takes the rest
//!   of its token, or else the next argument
//! - `--name` and `--name=value`
//! - `-15` is the single numeric option `15`
//! - `--` ends options, `-` alone is an operand
//!
//! Options missing from the command's `OptSpec` are collected in `unknown`
//! instead of failing the parse; each command decides how strict to be.

use std::collections::{BTreeSet, HashMap};

use super::traits::OptSpec;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    pub operands: Vec<String>,
    pub strings: HashMap<String, String>,
    pub flags: BTreeSet<String>,
    /// Option names the `OptSpec` does not declare, in order of appearance.
    pub unknown: Vec<String>,
    /// A string option was missing its value.
    pub malformed: bool,
}

impl ParsedArgs {
    pub fn parse(args: &[String], spec: &OptSpec) -> Self {
        let mut parsed = ParsedArgs::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            if arg == "--" {
                parsed.operands.extend(iter.by_ref().cloned());
                break;
            }
            if let Some(long) = arg.strip_prefix("--") {
                let (name, inline) = match long.split_once('=') {
                    Some((name, value)) => (name, Some(value.to_string())),
                    None => (long, None),
                };
                parsed.option(name, inline, &mut iter, spec);
                continue;
            }
            match arg.strip_prefix('-') {
                Some(short) if !short.is_empty() => {
                    if short.chars().all(|c| c.is_ascii_digit()) {
                        parsed.option(short, None, &mut iter, spec);
                        continue;
                    }
                    for (at, c) in short.char_indices() {
                        let name = c.to_string();
                        if spec.string.contains(&name) {
                            let rest = &short[at + c.len_utf8()..];
                            let inline = (!rest.is_empty()).then(|| rest.to_string());
                            parsed.option(&name, inline, &mut iter, spec);
                            break;
                        }
                        parsed.option(&name, None, &mut iter, spec);
                    }
                }
                _ => {
                    parsed.operands.push(arg.clone());
                    if spec.stop_early {
                        parsed.operands.extend(iter.by_ref().cloned());
                        break;
                    }
                }
            }
        }
        parsed
    }

    fn option<'a>(
        &mut self,
        name: &str,
        inline: Option<String>,
        rest: &mut impl Iterator<Item = &'a String>,
        spec: &OptSpec,
    ) {
        if spec.string.iter().any(|s| s == name) {
            match inline.or_else(|| rest.next().cloned()) {
                Some(value) => {
                    self.strings.insert(name.to_string(), value);
                }
                None => self.malformed = true,
            }
        } else if spec.boolean.iter().any(|b| b == name) {
            self.flags.insert(name.to_string());
        } else {
            self.unknown.push(name.to_string());
        }
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.strings.get(name).map(String::as_str)
    }
}
