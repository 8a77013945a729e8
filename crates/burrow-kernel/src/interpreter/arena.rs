//! Arena of running term nodes.
//!
//! Nodes refer to their parent by id, never owning it; ancestor queries walk
//! the index. A node lives from the moment its parent's semantics
//! instantiates it until the parent frees it (with its whole subtree).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::control_flow::ExecState;
use crate::ast::Term;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u64);

impl fmt::Display for TermId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TermNode {
    pub id: TermId,
    pub parent: Option<TermId>,
    pub def: Arc<Term>,
    pub state: ExecState,
    /// This simple command is running a shell function.
    pub invokes_function: bool,
    children: Vec<TermId>,
}

#[derive(Debug, Default)]
pub struct TermArena {
    nodes: HashMap<TermId, TermNode>,
    next: u64,
}

impl TermArena {
    pub fn insert(&mut self, def: Arc<Term>, parent: Option<TermId>) -> TermId {
        self.next += 1;
        let id = TermId(self.next);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        self.nodes.insert(
            id,
            TermNode {
                id,
                parent,
                def,
                state: ExecState::default(),
                invokes_function: false,
                children: Vec::new(),
            },
        );
        id
    }

    pub fn get(&self, id: TermId) -> Option<&TermNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: TermId) -> Option<&mut TermNode> {
        self.nodes.get_mut(&id)
    }

    /// Remove a node and everything instantiated beneath it, returning the
    /// node's final state.
    pub fn free(&mut self, id: TermId) -> Option<ExecState> {
        let node = self.nodes.remove(&id)?;
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != id);
        }
        let mut stack = node.children;
        while let Some(child) = stack.pop() {
            if let Some(removed) = self.nodes.remove(&child) {
                stack.extend(removed.children);
            }
        }
        Some(node.state)
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: TermId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.get(id).and_then(|n| n.parent),
        }
    }

    pub fn find_ancestor(&self, id: TermId, pred: impl Fn(&TermNode) -> bool) -> Option<&TermNode> {
        self.ancestors(id).find(|node| pred(node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub struct Ancestors<'a> {
    arena: &'a TermArena,
    next: Option<TermId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a TermNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.get(self.next?)?;
        self.next = node.parent;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> Arc<Term> {
        Arc::new(Term::cmd(["true"]))
    }

    #[test]
    fn free_removes_whole_subtree() {
        let mut arena = TermArena::default();
        let root = arena.insert(def(), None);
        let child = arena.insert(def(), Some(root));
        let grandchild = arena.insert(def(), Some(child));
        let sibling = arena.insert(def(), Some(root));
        assert_eq!(arena.len(), 4);

        arena.free(child);
        assert!(arena.get(grandchild).is_none());
        assert!(arena.get(sibling).is_some());
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn ancestors_walk_nearest_first() {
        let mut arena = TermArena::default();
        let root = arena.insert(def(), None);
        let mid = arena.insert(def(), Some(root));
        let leaf = arena.insert(def(), Some(mid));
        let ids: Vec<TermId> = arena.ancestors(leaf).map(|n| n.id).collect();
        assert_eq!(ids, vec![mid, root]);
        assert!(arena.ancestors(root).next().is_none());
    }

    #[test]
    fn ids_are_never_recycled() {
        let mut arena = TermArena::default();
        let a = arena.insert(def(), None);
        arena.free(a);
        let b = arena.insert(def(), None);
        assert_ne!(a, b);
    }
}
