//! Open file descriptions and per-process descriptor tables.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::inode::{INodeKind, INodeRef};
use crate::error::TermError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    /// Truncates regular files.
    Write,
    Append,
}

impl OpenMode {
    pub fn reads(self) -> bool {
        matches!(self, OpenMode::Read)
    }

    pub fn writes(self) -> bool {
        matches!(self, OpenMode::Write | OpenMode::Append)
    }
}

/// An inode opened in some mode, with its own line offset.
///
/// Dropping the last reference closes it, which is how pipe ends learn
/// that a stage has exited.
#[derive(Debug)]
pub struct OpenFile {
    path: String,
    inode: INodeRef,
    mode: OpenMode,
    offset: Mutex<usize>,
}

impl OpenFile {
    pub fn open(inode: INodeRef, path: impl Into<String>, mode: OpenMode) -> Result<Arc<Self>, TermError> {
        let path = path.into();
        let offset = match (inode.kind(), mode) {
            (INodeKind::Directory, m) if m.writes() => {
                return Err(TermError::IsADirectory(path));
            }
            (INodeKind::Regular, OpenMode::Write) => {
                inode.truncate();
                0
            }
            (INodeKind::Regular, OpenMode::Append) => inode.len(),
            _ => 0,
        };
        if let Some(device) = inode.as_device() {
            device.open(mode);
        }
        Ok(Arc::new(Self {
            path,
            inode,
            mode,
            offset: Mutex::new(offset),
        }))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn inode(&self) -> &INodeRef {
        &self.inode
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    fn offset(&self) -> usize {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn advance(&self, by: usize) {
        *self.offset.lock().unwrap_or_else(|e| e.into_inner()) += by;
    }

    /// Read up to `max_lines` lines; 0 means end of file.
    pub async fn read(&self, buffer: &mut Vec<String>, max_lines: usize) -> Result<usize, TermError> {
        let n = self
            .inode
            .read(&self.path, buffer, max_lines, self.offset())
            .await?;
        self.advance(n);
        Ok(n)
    }

    pub async fn write(&self, buffer: &mut Vec<String>) -> Result<usize, TermError> {
        let n = self.inode.write(&self.path, buffer, self.offset()).await?;
        self.advance(n);
        Ok(n)
    }
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        if let Some(device) = self.inode.as_device() {
            device.close(self.mode);
        }
    }
}

/// A process's descriptor table. Cloning shares the open descriptions.
#[derive(Debug, Clone, Default)]
pub struct FdTable {
    fds: BTreeMap<u32, Arc<OpenFile>>,
}

impl FdTable {
    pub fn get(&self, fd: u32) -> Option<Arc<OpenFile>> {
        self.fds.get(&fd).cloned()
    }

    /// Install a description, returning the one it replaced.
    pub fn set(&mut self, fd: u32, file: Arc<OpenFile>) -> Option<Arc<OpenFile>> {
        self.fds.insert(fd, file)
    }

    pub fn remove(&mut self, fd: u32) -> Option<Arc<OpenFile>> {
        self.fds.remove(&fd)
    }

    pub fn len(&self) -> usize {
        self.fds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::INode;

    #[tokio::test]
    async fn offsets_advance_per_description() {
        let file = INode::regular(vec!["a".into(), "b".into(), "c".into()]);
        let first = OpenFile::open(Arc::clone(&file), "/f", OpenMode::Read).unwrap();
        let second = OpenFile::open(Arc::clone(&file), "/f", OpenMode::Read).unwrap();

        let mut buf = Vec::new();
        assert_eq!(first.read(&mut buf, 2).await.unwrap(), 2);
        assert_eq!(first.read(&mut buf, 2).await.unwrap(), 1);
        assert_eq!(first.read(&mut buf, 2).await.unwrap(), 0);
        assert_eq!(second.read(&mut buf, 5).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn write_truncates_and_append_extends() {
        let file = INode::regular(vec!["old".into()]);
        let w = OpenFile::open(Arc::clone(&file), "/f", OpenMode::Write).unwrap();
        w.write(&mut vec!["one".to_string()]).await.unwrap();
        let a = OpenFile::open(Arc::clone(&file), "/f", OpenMode::Append).unwrap();
        a.write(&mut vec!["two".to_string()]).await.unwrap();
        assert_eq!(file.lines(), vec!["one", "two"]);
    }

    #[test]
    fn directories_cannot_be_opened_for_write() {
        let dir = INode::directory();
        assert!(matches!(
            OpenFile::open(dir, "/d", OpenMode::Write),
            Err(TermError::IsADirectory(_))
        ));
    }
}
