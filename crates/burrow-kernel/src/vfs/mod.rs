//! Virtual file tree for burrow.
//!
//! Directories and regular files hold lines in memory; device inodes (see
//! [`crate::device`]) implement reads and writes in code. Processes reach
//! inodes through [`OpenFile`] descriptions in their [`FdTable`].

mod fd;
mod fifo;
mod inode;
mod tree;

pub use fd::{FdTable, OpenFile, OpenMode};
pub use fifo::Fifo;
pub use inode::{INode, INodeKind, INodeRef};
pub use tree::{FileTree, normalize};
