//! Word expansion.
//!
//! Unquoted parameters split into fields on whitespace; double quotes join
//! their parts into one field; single quotes are taken literally. Adjacent
//! pieces of a concatenated word glue onto each other's edge fields.

use super::scope::Scope;
use crate::ast::Word;
use crate::process::Pid;

/// Split on runs of whitespace. An all-blank word yields no fields.
pub fn split_fields(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Look up `$name`, including the special parameters.
pub fn lookup(name: &str, scope: &Scope, pid: Pid) -> Option<String> {
    match name {
        "?" => Some(scope.last_exit().to_string()),
        "$" => Some(pid.to_string()),
        "!" => scope.last_background().map(|p| p.to_string()),
        "#" => Some(scope.positional().len().to_string()),
        "@" | "*" => Some(scope.positional().join(" ")),
        "0" => Some("burrow".to_string()),
        n if n.chars().all(|c| c.is_ascii_digit()) => {
            let index: usize = n.parse().ok()?;
            scope.positional().get(index.checked_sub(1)?).cloned()
        }
        n => scope.get(n).map(str::to_string),
    }
}

/// Expand a word into zero or more fields.
pub fn expand_word(word: &Word, scope: &Scope, pid: Pid) -> Vec<String> {
    match word {
        Word::Literal(s) | Word::SingleQuote(s) => vec![s.clone()],
        Word::Param(name) if name == "@" => scope.positional().to_vec(),
        Word::Param(name) => lookup(name, scope, pid)
            .map(|v| split_fields(&v))
            .unwrap_or_default(),
        Word::DoubleQuote(parts) => {
            // "$@" keeps one field per positional parameter.
            if let [Word::Param(name)] = parts.as_slice() {
                if name == "@" {
                    return scope.positional().to_vec();
                }
            }
            vec![quoted(parts, scope, pid)]
        }
        Word::Concat(parts) => {
            let mut fields: Vec<String> = Vec::new();
            for part in parts {
                let mut next = expand_word(part, scope, pid).into_iter();
                match (fields.last_mut(), next.next()) {
                    (Some(last), Some(first)) => last.push_str(&first),
                    (None, Some(first)) => fields.push(first),
                    (_, None) => {}
                }
                fields.extend(next);
            }
            fields
        }
    }
}

/// Text of a double-quoted word.
fn quoted(parts: &[Word], scope: &Scope, pid: Pid) -> String {
    parts
        .iter()
        .map(|part| match part {
            Word::Param(name) => lookup(name, scope, pid).unwrap_or_default(),
            Word::DoubleQuote(inner) => quoted(inner, scope, pid),
            other => expand_word(other, scope, pid).join(" "),
        })
        .collect()
}

/// Expand a word that must produce exactly one string (assignment values,
/// redirect targets).
pub fn expand_single(word: &Word, scope: &Scope, pid: Pid) -> String {
    match word {
        Word::Param(name) => lookup(name, scope, pid).unwrap_or_default(),
        other => expand_word(other, scope, pid).join(" "),
    }
}

pub fn expand_words(words: &[Word], scope: &Scope, pid: Pid) -> Vec<String> {
    words
        .iter()
        .flat_map(|w| expand_word(w, scope, pid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scope() -> Scope {
        let mut scope = Scope::default();
        scope.set("X", "a  b").unwrap();
        scope.set("EMPTY", "   ").unwrap();
        scope.set_positional(vec!["one".into(), "two words".into()]);
        scope.set_last_exit(3);
        scope
    }

    #[rstest]
    #[case::literal(Word::lit("hi"), vec!["hi"])]
    #[case::unquoted_splits(Word::param("X"), vec!["a", "b"])]
    #[case::blank_yields_nothing(Word::param("EMPTY"), vec![])]
    #[case::unset_yields_nothing(Word::param("NOPE"), vec![])]
    #[case::quoted_keeps_spacing(Word::quoted(vec![Word::param("X")]), vec!["a  b"])]
    #[case::quoted_unset_is_empty(Word::quoted(vec![Word::param("NOPE")]), vec![""])]
    #[case::single_quote(Word::SingleQuote("$X".into()), vec!["$X"])]
    #[case::status(Word::param("?"), vec!["3"])]
    #[case::positional(Word::param("2"), vec!["two", "words"])]
    #[case::quoted_at(Word::quoted(vec![Word::param("@")]), vec!["one", "two words"])]
    #[case::count(Word::param("#"), vec!["2"])]
    #[case::concat(
        Word::Concat(vec![Word::lit("x="), Word::param("X"), Word::lit("!")]),
        vec!["x=a", "b!"]
    )]
    fn expands(#[case] word: Word, #[case] expected: Vec<&str>) {
        assert_eq!(expand_word(&word, &scope(), Pid(7)), expected);
    }

    #[test]
    fn pid_parameter() {
        assert_eq!(expand_single(&Word::param("$"), &scope(), Pid(42)), "42");
    }
}
