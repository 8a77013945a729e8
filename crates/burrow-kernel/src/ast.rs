//! Term definitions for burrow.
//!
//! These types describe an already-parsed command tree. A parser (or the CLI,
//! reading JSON) produces them; the interpreter instantiates them as running
//! nodes in the term arena.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A position in the source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePos {
    pub row: usize,
    pub col: usize,
    pub offset: usize,
}

/// Source span of a term, plus any extra positions the parser recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMap {
    pub from: CodePos,
    pub to: CodePos,
    #[serde(default)]
    pub extra: Vec<CodePos>,
}

impl SourceMap {
    fn positions_mut(&mut self) -> impl Iterator<Item = &mut CodePos> {
        [&mut self.from, &mut self.to]
            .into_iter()
            .chain(self.extra.iter_mut())
    }
}

/// A shell word before expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Word {
    /// Unquoted text, already split by the parser.
    Literal(String),
    /// `'text'`
    SingleQuote(String),
    /// `"..."`, joined into a single field.
    DoubleQuote(Vec<Word>),
    /// `$name` or `${name}`.
    Param(String),
    /// Adjacent pieces forming one word, e.g. `foo"$x"`.
    Concat(Vec<Word>),
}

impl Word {
    pub fn lit(s: impl Into<String>) -> Self {
        Word::Literal(s.into())
    }

    pub fn param(name: impl Into<String>) -> Self {
        Word::Param(name.into())
    }

    pub fn quoted(parts: Vec<Word>) -> Self {
        Word::DoubleQuote(parts)
    }
}

impl From<&str> for Word {
    fn from(s: &str) -> Self {
        Word::Literal(s.to_string())
    }
}

/// Redirection operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RedirectOp {
    /// `<`
    Read,
    /// `>`
    Write,
    /// `>>`
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub fd: u32,
    pub op: RedirectOp,
    pub target: Word,
}

/// `NAME=value` preceding (or standing in for) a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assign {
    pub name: String,
    pub value: Word,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleDef {
    #[serde(default)]
    pub assigns: Vec<Assign>,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub redirects: Vec<Redirect>,
    #[serde(default)]
    pub background: bool,
    #[serde(default)]
    pub source_map: Option<SourceMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipeDef {
    pub stages: Vec<Term>,
    #[serde(default)]
    pub background: bool,
    #[serde(default)]
    pub source_map: Option<SourceMap>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BinaryOp {
    /// `&&`
    And,
    /// `||`
    Or,
    /// `;`
    Seq,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryDef {
    pub op: BinaryOp,
    pub left: Box<Term>,
    pub right: Box<Term>,
    #[serde(default)]
    pub source_map: Option<SourceMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundDef {
    pub items: Vec<Term>,
    #[serde(default)]
    pub background: bool,
    #[serde(default)]
    pub source_map: Option<SourceMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub body: Box<Term>,
    /// Source text of the declaration, when the parser kept it.
    #[serde(default)]
    pub src: Option<String>,
    #[serde(default)]
    pub source_map: Option<SourceMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhileDef {
    pub guard: Box<Term>,
    pub body: Box<Term>,
    #[serde(default)]
    pub source_map: Option<SourceMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForDef {
    pub var: String,
    pub items: Vec<Word>,
    pub body: Box<Term>,
    #[serde(default)]
    pub source_map: Option<SourceMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellDef {
    #[serde(default)]
    pub interactive: bool,
    pub body: Box<Term>,
}

/// A term definition. Immutable once constructed; running instances live in
/// the term arena.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Term {
    Simple(SimpleDef),
    Pipe(PipeDef),
    Binary(BinaryDef),
    Compound(CompoundDef),
    Function(FunctionDef),
    While(WhileDef),
    For(ForDef),
    Shell(ShellDef),
}

impl Term {
    /// Short name used in diagnostics.
    pub fn key(&self) -> &'static str {
        match self {
            Term::Simple(_) => "simple",
            Term::Pipe(_) => "pipe",
            Term::Binary(_) => "binary",
            Term::Compound(_) => "compound",
            Term::Function(_) => "function",
            Term::While(_) => "while",
            Term::For(_) => "for",
            Term::Shell(_) => "shell",
        }
    }

    /// Child definitions in execution order.
    ///
    /// A function declaration has no children: its body only runs when the
    /// function is invoked.
    pub fn children(&self) -> Vec<&Term> {
        match self {
            Term::Simple(_) | Term::Function(_) => Vec::new(),
            Term::Pipe(p) => p.stages.iter().collect(),
            Term::Binary(b) => vec![&*b.left, &*b.right],
            Term::Compound(c) => c.items.iter().collect(),
            Term::While(w) => vec![&*w.guard, &*w.body],
            Term::For(f) => vec![&*f.body],
            Term::Shell(s) => vec![&*s.body],
        }
    }

    pub fn is_background(&self) -> bool {
        match self {
            Term::Simple(s) => s.background,
            Term::Pipe(p) => p.background,
            Term::Compound(c) => c.background,
            _ => false,
        }
    }

    /// The same term, running in the foreground.
    pub fn foreground(&self) -> Term {
        let mut term = self.clone();
        match &mut term {
            Term::Simple(s) => s.background = false,
            Term::Pipe(p) => p.background = false,
            Term::Compound(c) => c.background = false,
            _ => {}
        }
        term
    }

    pub fn source_map(&self) -> Option<&SourceMap> {
        match self {
            Term::Simple(d) => d.source_map.as_ref(),
            Term::Pipe(d) => d.source_map.as_ref(),
            Term::Binary(d) => d.source_map.as_ref(),
            Term::Compound(d) => d.source_map.as_ref(),
            Term::Function(d) => d.source_map.as_ref(),
            Term::While(d) => d.source_map.as_ref(),
            Term::For(d) => d.source_map.as_ref(),
            Term::Shell(_) => None,
        }
    }

    fn source_map_mut(&mut self) -> Option<&mut SourceMap> {
        match self {
            Term::Simple(d) => d.source_map.as_mut(),
            Term::Pipe(d) => d.source_map.as_mut(),
            Term::Binary(d) => d.source_map.as_mut(),
            Term::Compound(d) => d.source_map.as_mut(),
            Term::Function(d) => d.source_map.as_mut(),
            Term::While(d) => d.source_map.as_mut(),
            Term::For(d) => d.source_map.as_mut(),
            Term::Shell(_) => None,
        }
    }

    /// Visit this term and every nested term, including function bodies.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Term)) {
        f(self);
        match self {
            Term::Simple(_) => {}
            Term::Pipe(p) => {
                for stage in &mut p.stages {
                    stage.walk_mut(&mut *f);
                }
            }
            Term::Binary(b) => {
                b.left.walk_mut(f);
                b.right.walk_mut(f);
            }
            Term::Compound(c) => {
                for item in &mut c.items {
                    item.walk_mut(&mut *f);
                }
            }
            Term::Function(d) => d.body.walk_mut(f),
            Term::While(w) => {
                w.guard.walk_mut(f);
                w.body.walk_mut(f);
            }
            Term::For(d) => d.body.walk_mut(f),
            Term::Shell(s) => s.body.walk_mut(f),
        }
    }

    /// Make every source position relative to this term's first position.
    ///
    /// Positions on the first row shift left so the body starts at column 1;
    /// rows shift up so the body starts on row 1; offsets start at 0.
    pub fn rebase_source_map(&mut self) {
        let Some(first) = self.source_map().map(|sm| sm.from) else {
            return;
        };
        self.walk_mut(&mut |term| {
            if let Some(sm) = term.source_map_mut() {
                for pos in sm.positions_mut() {
                    if pos.row == first.row {
                        pos.col = pos.col.saturating_sub(first.col.saturating_sub(1));
                    }
                    pos.row = pos.row.saturating_sub(first.row.saturating_sub(1));
                    pos.offset = pos.offset.saturating_sub(first.offset);
                }
            }
        });
    }

    // Builders, mostly for tests and embedding.

    pub fn cmd<I, W>(words: I) -> Term
    where
        I: IntoIterator<Item = W>,
        W: Into<Word>,
    {
        Term::Simple(SimpleDef {
            words: words.into_iter().map(Into::into).collect(),
            ..SimpleDef::default()
        })
    }

    pub fn words(words: Vec<Word>) -> Term {
        Term::Simple(SimpleDef {
            words,
            ..SimpleDef::default()
        })
    }

    pub fn assign(name: impl Into<String>, value: impl Into<Word>) -> Term {
        Term::Simple(SimpleDef {
            assigns: vec![Assign {
                name: name.into(),
                value: value.into(),
            }],
            ..SimpleDef::default()
        })
    }

    pub fn redirect(mut self, fd: u32, op: RedirectOp, target: impl Into<Word>) -> Term {
        if let Term::Simple(s) = &mut self {
            s.redirects.push(Redirect {
                fd,
                op,
                target: target.into(),
            });
        }
        self
    }

    pub fn background(mut self) -> Term {
        match &mut self {
            Term::Simple(s) => s.background = true,
            Term::Pipe(p) => p.background = true,
            Term::Compound(c) => c.background = true,
            _ => {}
        }
        self
    }

    pub fn pipe(stages: Vec<Term>) -> Term {
        Term::Pipe(PipeDef {
            stages,
            background: false,
            source_map: None,
        })
    }

    fn binary(op: BinaryOp, left: Term, right: Term) -> Term {
        Term::Binary(BinaryDef {
            op,
            left: Box::new(left),
            right: Box::new(right),
            source_map: None,
        })
    }

    pub fn and(left: Term, right: Term) -> Term {
        Term::binary(BinaryOp::And, left, right)
    }

    pub fn or(left: Term, right: Term) -> Term {
        Term::binary(BinaryOp::Or, left, right)
    }

    pub fn seq(left: Term, right: Term) -> Term {
        Term::binary(BinaryOp::Seq, left, right)
    }

    pub fn group(items: Vec<Term>) -> Term {
        Term::Compound(CompoundDef {
            items,
            background: false,
            source_map: None,
        })
    }

    pub fn function(name: impl Into<String>, body: Term) -> Term {
        Term::Function(FunctionDef {
            name: name.into(),
            body: Box::new(body),
            src: None,
            source_map: None,
        })
    }

    pub fn while_loop(guard: Term, body: Term) -> Term {
        Term::While(WhileDef {
            guard: Box::new(guard),
            body: Box::new(body),
            source_map: None,
        })
    }

    pub fn for_loop<I, W>(var: impl Into<String>, items: I, body: Term) -> Term
    where
        I: IntoIterator<Item = W>,
        W: Into<Word>,
    {
        Term::For(ForDef {
            var: var.into(),
            items: items.into_iter().map(Into::into).collect(),
            body: Box::new(body),
            source_map: None,
        })
    }

    pub fn shell(interactive: bool, body: Term) -> Term {
        Term::Shell(ShellDef {
            interactive,
            body: Box::new(body),
        })
    }

    pub fn with_source_map(mut self, map: SourceMap) -> Term {
        if let Some(sm) = self.source_map_slot() {
            *sm = Some(map);
        }
        self
    }

    fn source_map_slot(&mut self) -> Option<&mut Option<SourceMap>> {
        match self {
            Term::Simple(d) => Some(&mut d.source_map),
            Term::Pipe(d) => Some(&mut d.source_map),
            Term::Binary(d) => Some(&mut d.source_map),
            Term::Compound(d) => Some(&mut d.source_map),
            Term::Function(d) => Some(&mut d.source_map),
            Term::While(d) => Some(&mut d.source_map),
            Term::For(d) => Some(&mut d.source_map),
            Term::Shell(_) => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Simple(s) => {
                let words: Vec<String> = s.words.iter().map(|w| w.to_string()).collect();
                write!(f, "{}", words.join(" "))
            }
            other => write!(f, "<{}>", other.key()),
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Word::Literal(s) => write!(f, "{s}"),
            Word::SingleQuote(s) => write!(f, "'{s}'"),
            Word::Param(name) => write!(f, "${name}"),
            Word::DoubleQuote(parts) => {
                write!(f, "\"")?;
                for part in parts {
                    write!(f, "{part}")?;
                }
                write!(f, "\"")
            }
            Word::Concat(parts) => parts.iter().try_for_each(|p| write!(f, "{p}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(row: usize, col: usize, offset: usize) -> CodePos {
        CodePos { row, col, offset }
    }

    fn span(from: CodePos, to: CodePos) -> SourceMap {
        SourceMap {
            from,
            to,
            extra: Vec::new(),
        }
    }

    #[test]
    fn children_follow_definition_order() {
        let term = Term::while_loop(Term::cmd(["true"]), Term::cmd(["echo", "x"]));
        let keys: Vec<String> = term.children().iter().map(|t| t.to_string()).collect();
        assert_eq!(keys, vec!["true", "echo x"]);
        assert!(Term::function("f", Term::cmd(["true"])).children().is_empty());
    }

    #[test]
    fn rebase_moves_body_to_origin() {
        let mut body = Term::group(vec![
            Term::cmd(["echo", "a"]).with_source_map(span(pos(3, 5, 40), pos(3, 11, 46))),
            Term::cmd(["echo", "b"]).with_source_map(span(pos(4, 3, 50), pos(4, 9, 56))),
        ])
        .with_source_map(span(pos(3, 5, 40), pos(4, 9, 56)));

        body.rebase_source_map();

        let Term::Compound(c) = &body else {
            panic!("expected compound");
        };
        assert_eq!(c.source_map.as_ref().unwrap().from, pos(1, 1, 0));
        assert_eq!(c.items[0].source_map().unwrap().to, pos(1, 7, 6));
        // Only the first row shifts columns.
        assert_eq!(c.items[1].source_map().unwrap().from, pos(2, 3, 10));
    }

    #[test]
    fn json_roundtrip_keeps_kind_tags() {
        let term = Term::and(
            Term::cmd(["true"]),
            Term::words(vec![Word::lit("echo"), Word::param("x")]),
        );
        let json = serde_json::to_value(&term).unwrap();
        assert_eq!(json["kind"], "binary");
        assert_eq!(json["op"], "and");
        assert_eq!(json["right"]["words"][1]["kind"], "param");
        let back: Term = serde_json::from_value(json).unwrap();
        assert_eq!(back, term);
    }

    #[test]
    fn foreground_clears_background_flag() {
        let term = Term::cmd(["sleep", "1"]).background();
        assert!(term.is_background());
        assert!(!term.foreground().is_background());
    }
}
