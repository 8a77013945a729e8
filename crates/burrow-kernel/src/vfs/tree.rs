//! The virtual file tree.
//!
//! Paths are `/`-separated; relative paths resolve against a working
//! directory. Every directory owns its children exclusively.

use std::sync::Arc;

use super::inode::{INode, INodeKind, INodeRef};
use crate::device::Device;
use crate::error::TermError;

/// Resolve `path` against `cwd`, collapsing `.` and `..`.
pub fn normalize(path: &str, cwd: &str) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("{cwd}/{path}")
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

fn split_parent(abs: &str) -> Option<(&str, &str)> {
    let (parent, name) = abs.rsplit_once('/')?;
    if name.is_empty() {
        return None;
    }
    Some((if parent.is_empty() { "/" } else { parent }, name))
}

#[derive(Debug, Clone)]
pub struct FileTree {
    root: INodeRef,
}

impl Default for FileTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FileTree {
    /// An empty root directory.
    pub fn new() -> Self {
        Self {
            root: INode::directory(),
        }
    }

    pub fn root(&self) -> &INodeRef {
        &self.root
    }

    pub fn resolve(&self, path: &str, cwd: &str) -> Result<INodeRef, TermError> {
        let abs = normalize(path, cwd);
        let mut node = Arc::clone(&self.root);
        for part in abs.split('/').filter(|p| !p.is_empty()) {
            if !node.is_dir() {
                return Err(TermError::NotADirectory(path.to_string()));
            }
            node = node
                .child(part)
                .ok_or_else(|| TermError::NoSuchFile(path.to_string()))?;
        }
        Ok(node)
    }

    pub fn exists(&self, path: &str, cwd: &str) -> bool {
        self.resolve(path, cwd).is_ok()
    }

    /// The directory that would hold `path`, and the final name.
    fn resolve_parent(&self, path: &str, cwd: &str) -> Result<(INodeRef, String), TermError> {
        let abs = normalize(path, cwd);
        let (parent, name) =
            split_parent(&abs).ok_or_else(|| TermError::FileExists(path.to_string()))?;
        let dir = self.resolve(parent, "/").map_err(|e| match e {
            TermError::NoSuchFile(_) => TermError::NoSuchFile(path.to_string()),
            _ => TermError::NotADirectory(path.to_string()),
        })?;
        if !dir.is_dir() {
            return Err(TermError::NotADirectory(path.to_string()));
        }
        Ok((dir, name.to_string()))
    }

    /// Attach `node` at `path`, which must not exist yet.
    pub fn mount(&self, path: &str, node: INodeRef) -> Result<(), TermError> {
        let (dir, name) = self.resolve_parent(path, "/")?;
        if dir.insert_child(&name, node) {
            Ok(())
        } else {
            Err(TermError::FileExists(path.to_string()))
        }
    }

    pub fn mount_device(&self, path: &str, device: Arc<dyn Device>) -> Result<(), TermError> {
        self.mount(path, INode::device(device))
    }

    pub fn mkdir(&self, path: &str, cwd: &str, parents: bool) -> Result<(), TermError> {
        if !parents {
            let (dir, name) = self.resolve_parent(path, cwd)?;
            return if dir.insert_child(&name, INode::directory()) {
                Ok(())
            } else {
                Err(TermError::FileExists(path.to_string()))
            };
        }
        let abs = normalize(path, cwd);
        let mut node = Arc::clone(&self.root);
        for part in abs.split('/').filter(|p| !p.is_empty()) {
            node = match node.child(part) {
                Some(child) if child.is_dir() => child,
                Some(_) => return Err(TermError::NotADirectory(path.to_string())),
                None => {
                    let child = INode::directory();
                    node.insert_child(part, Arc::clone(&child));
                    child
                }
            };
        }
        Ok(())
    }

    /// Remove an entry. Non-empty directories need `recursive`.
    pub fn remove(&self, path: &str, cwd: &str, recursive: bool) -> Result<(), TermError> {
        let (dir, name) = self.resolve_parent(path, cwd)?;
        let node = dir
            .child(&name)
            .ok_or_else(|| TermError::NoSuchFile(path.to_string()))?;
        if node.is_dir() && !node.is_empty() && !recursive {
            return Err(TermError::DirectoryNotEmpty(path.to_string()));
        }
        dir.remove_child(&name);
        Ok(())
    }

    /// Create or replace a regular file.
    pub fn write_file(&self, path: &str, lines: Vec<String>) -> Result<(), TermError> {
        let (dir, name) = self.resolve_parent(path, "/")?;
        match dir.child(&name) {
            Some(existing) if existing.is_dir() => Err(TermError::IsADirectory(path.to_string())),
            Some(_) => {
                dir.remove_child(&name);
                dir.insert_child(&name, INode::regular(lines));
                Ok(())
            }
            None => {
                dir.insert_child(&name, INode::regular(lines));
                Ok(())
            }
        }
    }

    pub fn read_file(&self, path: &str) -> Result<Vec<String>, TermError> {
        let node = self.resolve(path, "/")?;
        match node.kind() {
            INodeKind::Directory => Err(TermError::IsADirectory(path.to_string())),
            _ => Ok(node.lines()),
        }
    }

    /// Resolve for writing, creating an empty regular file if missing.
    pub fn create(&self, path: &str, cwd: &str) -> Result<INodeRef, TermError> {
        match self.resolve(path, cwd) {
            Ok(node) => Ok(node),
            Err(TermError::NoSuchFile(_)) => {
                let (dir, name) = self.resolve_parent(path, cwd)?;
                let node = INode::regular(Vec::new());
                dir.insert_child(&name, Arc::clone(&node));
                Ok(node)
            }
            Err(e) => Err(e),
        }
    }

    pub fn list(&self, path: &str, cwd: &str) -> Result<Vec<(String, INodeKind)>, TermError> {
        let node = self.resolve(path, cwd)?;
        if !node.is_dir() {
            return Err(TermError::NotADirectory(path.to_string()));
        }
        Ok(node
            .entries()
            .into_iter()
            .map(|(name, child)| (name, child.kind()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::absolute("/a/b", "/x", "/a/b")]
    #[case::relative("b/c", "/a", "/a/b/c")]
    #[case::dots("./b/../c", "/a", "/a/c")]
    #[case::above_root("../../..", "/a", "/")]
    #[case::trailing_slash("/a/b/", "/", "/a/b")]
    fn normalizes(#[case] path: &str, #[case] cwd: &str, #[case] expected: &str) {
        assert_eq!(normalize(path, cwd), expected);
    }

    fn tree() -> FileTree {
        let tree = FileTree::new();
        tree.mkdir("/home/user", "/", true).unwrap();
        tree.write_file("/home/user/notes", vec!["hi".into()]).unwrap();
        tree
    }

    #[test]
    fn missing_path_is_no_such_file() {
        let err = tree().resolve("/home/nobody", "/").unwrap_err();
        assert_eq!(err.to_string(), "/home/nobody: no such file or directory");
    }

    #[test]
    fn file_in_the_middle_is_not_a_directory() {
        let err = tree().resolve("/home/user/notes/deeper", "/").unwrap_err();
        assert_eq!(err.to_string(), "/home/user/notes/deeper: not a directory");
    }

    #[test]
    fn mkdir_without_parents_requires_parent() {
        let tree = tree();
        assert!(matches!(
            tree.mkdir("/a/b", "/", false),
            Err(TermError::NoSuchFile(_))
        ));
        tree.mkdir("/a/b", "/", true).unwrap();
        assert!(matches!(
            tree.mkdir("/a", "/", false),
            Err(TermError::FileExists(_))
        ));
    }

    #[test]
    fn removing_non_empty_directory_needs_recursive() {
        let tree = tree();
        assert!(matches!(
            tree.remove("/home", "/", false),
            Err(TermError::DirectoryNotEmpty(_))
        ));
        tree.remove("/home", "/", true).unwrap();
        assert!(!tree.exists("/home/user/notes", "/"));
    }

    #[test]
    fn mount_refuses_duplicates() {
        let tree = tree();
        tree.mount("/home/user/dev", INode::directory()).unwrap();
        assert!(matches!(
            tree.mount("/home/user/dev", INode::directory()),
            Err(TermError::FileExists(_))
        ));
    }

    #[test]
    fn list_is_sorted_by_name() {
        let tree = tree();
        tree.write_file("/home/user/apple", Vec::new()).unwrap();
        let names: Vec<String> = tree
            .list("/home/user", "/")
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["apple", "notes"]);
    }
}
