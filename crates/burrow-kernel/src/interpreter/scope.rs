//! Variable scope for a process.
//!
//! A scope holds:
//! - A stack of frames, each with variables and positional parameters
//!   (a function call pushes one)
//! - Function definitions, with a read-only flag
//! - `$?`, `$!` and the working directory

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ast::Term;
use crate::error::TermError;
use crate::process::Pid;

#[derive(Debug, Clone, Default)]
struct Frame {
    vars: HashMap<String, String>,
    positional: Vec<String>,
}

/// A registered shell function.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    /// Private copy of the declared body, with rebased source positions.
    pub body: Arc<Term>,
    pub src: Option<String>,
    pub readonly: bool,
}

/// Variable scope with nested frames.
///
/// Lookups search from innermost to outermost frame. Assignments update the
/// nearest frame that already binds the name, or the root frame.
#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<Frame>,
    functions: HashMap<String, FunctionEntry>,
    readonly_vars: HashSet<String>,
    last_exit: i32,
    last_background: Option<Pid>,
    cwd: String,
}

impl Scope {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self {
            frames: vec![Frame::default()],
            functions: HashMap::new(),
            readonly_vars: HashSet::new(),
            last_exit: 0,
            last_background: None,
            cwd: cwd.into(),
        }
    }

    /// Push a frame for a function call.
    pub fn push_frame(&mut self, positional: Vec<String>) {
        self.frames.push(Frame {
            vars: HashMap::new(),
            positional,
        });
    }

    /// Pop the innermost frame.
    ///
    /// Panics if attempting to pop the root frame.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        } else {
            panic!("cannot pop the root scope frame");
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.vars.get(name))
            .map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), TermError> {
        let name = name.into();
        if self.readonly_vars.contains(&name) {
            return Err(TermError::ReadonlyVariable(name));
        }
        let slot = self
            .frames
            .iter()
            .rposition(|frame| frame.vars.contains_key(&name))
            .unwrap_or(0);
        self.frames[slot].vars.insert(name, value.into());
        Ok(())
    }

    /// Bind a variable in the innermost frame only.
    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<(), TermError> {
        let name = name.into();
        if self.readonly_vars.contains(&name) {
            return Err(TermError::ReadonlyVariable(name));
        }
        if let Some(frame) = self.frames.last_mut() {
            frame.vars.insert(name, value.into());
        }
        Ok(())
    }

    /// Remove the nearest binding of `name`.
    pub fn unset(&mut self, name: &str) -> Result<(), TermError> {
        if self.readonly_vars.contains(name) {
            return Err(TermError::ReadonlyVariable(name.to_string()));
        }
        if let Some(frame) = self.frames.iter_mut().rev().find(|f| f.vars.contains_key(name)) {
            frame.vars.remove(name);
        }
        Ok(())
    }

    pub fn mark_readonly(&mut self, name: impl Into<String>) {
        self.readonly_vars.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Positional parameters of the innermost frame that has any.
    pub fn positional(&self) -> &[String] {
        self.frames
            .iter()
            .rev()
            .find(|frame| !frame.positional.is_empty())
            .map(|frame| frame.positional.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_positional(&mut self, args: Vec<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.positional = args;
        }
    }

    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    /// Register a function, refusing to replace a read-only one.
    pub fn define_function(&mut self, entry: FunctionEntry) -> Result<(), TermError> {
        if self.functions.get(&entry.name).is_some_and(|f| f.readonly) {
            return Err(TermError::ReadonlyFunction(entry.name));
        }
        self.functions.insert(entry.name.clone(), entry);
        Ok(())
    }

    /// Returns false if no such function is defined.
    pub fn mark_function_readonly(&mut self, name: &str) -> bool {
        match self.functions.get_mut(name) {
            Some(f) => {
                f.readonly = true;
                true
            }
            None => false,
        }
    }

    pub fn function_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn last_exit(&self) -> i32 {
        self.last_exit
    }

    pub fn set_last_exit(&mut self, code: i32) {
        self.last_exit = code;
    }

    pub fn last_background(&self) -> Option<Pid> {
        self.last_background
    }

    pub fn set_last_background(&mut self, pid: Pid) {
        self.last_background = Some(pid);
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn set_cwd(&mut self, cwd: impl Into<String>) {
        self.cwd = cwd.into();
    }

    /// All variable names visible from the innermost frame.
    pub fn all_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .frames
            .iter()
            .flat_map(|frame| frame.vars.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> FunctionEntry {
        FunctionEntry {
            name: name.to_string(),
            body: Arc::new(Term::cmd(["true"])),
            src: None,
            readonly: false,
        }
    }

    #[test]
    fn new_scope_has_one_frame() {
        let scope = Scope::default();
        assert_eq!(scope.depth(), 1);
        assert_eq!(scope.cwd(), "/");
    }

    #[test]
    fn set_and_get_variable() {
        let mut scope = Scope::default();
        scope.set("X", "42").unwrap();
        assert_eq!(scope.get("X"), Some("42"));
        assert!(scope.get("Y").is_none());
    }

    #[test]
    fn assignment_in_function_frame_updates_global() {
        let mut scope = Scope::default();
        scope.set("X", "outer").unwrap();
        scope.push_frame(vec!["a".into()]);
        scope.set("X", "changed").unwrap();
        scope.set_local("L", "local").unwrap();
        scope.pop_frame();
        assert_eq!(scope.get("X"), Some("changed"));
        assert!(scope.get("L").is_none());
    }

    #[test]
    fn inner_frame_shadows_outer() {
        let mut scope = Scope::default();
        scope.set("X", "outer").unwrap();
        scope.push_frame(Vec::new());
        scope.set_local("X", "inner").unwrap();
        assert_eq!(scope.get("X"), Some("inner"));
        scope.pop_frame();
        assert_eq!(scope.get("X"), Some("outer"));
    }

    #[test]
    fn positional_comes_from_innermost_frame() {
        let mut scope = Scope::default();
        scope.set_positional(vec!["top".into()]);
        scope.push_frame(vec!["a".into(), "b".into()]);
        assert_eq!(scope.positional(), ["a", "b"]);
        scope.pop_frame();
        assert_eq!(scope.positional(), ["top"]);
    }

    #[test]
    fn readonly_function_cannot_be_redefined() {
        let mut scope = Scope::default();
        scope.define_function(entry("f")).unwrap();
        assert!(scope.mark_function_readonly("f"));
        let err = scope.define_function(entry("f")).unwrap_err();
        assert_eq!(err.to_string(), "f: readonly function");
        assert!(!scope.mark_function_readonly("missing"));
    }

    #[test]
    fn readonly_variable_rejects_assignment() {
        let mut scope = Scope::default();
        scope.set("X", "1").unwrap();
        scope.mark_readonly("X");
        assert!(matches!(
            scope.set("X", "2"),
            Err(TermError::ReadonlyVariable(_))
        ));
    }

    #[test]
    #[should_panic(expected = "cannot pop the root scope frame")]
    fn pop_root_frame_panics() {
        let mut scope = Scope::default();
        scope.pop_frame();
    }
}
