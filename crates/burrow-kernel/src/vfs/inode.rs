//! File tree entries.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::device::{Device, DeviceKind};
use crate::error::TermError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum INodeKind {
    Directory,
    Regular,
    Device(DeviceKind),
}

pub type INodeRef = Arc<INode>;

#[derive(Debug)]
enum Body {
    Directory(Mutex<BTreeMap<String, INodeRef>>),
    Regular(Mutex<Vec<String>>),
    Device(Arc<dyn Device>),
}

/// A directory, a regular file of lines, or a device.
#[derive(Debug)]
pub struct INode {
    body: Body,
}

impl INode {
    pub fn directory() -> INodeRef {
        Arc::new(INode {
            body: Body::Directory(Mutex::new(BTreeMap::new())),
        })
    }

    pub fn regular(lines: Vec<String>) -> INodeRef {
        Arc::new(INode {
            body: Body::Regular(Mutex::new(lines)),
        })
    }

    pub fn device(device: Arc<dyn Device>) -> INodeRef {
        Arc::new(INode {
            body: Body::Device(device),
        })
    }

    pub fn kind(&self) -> INodeKind {
        match &self.body {
            Body::Directory(_) => INodeKind::Directory,
            Body::Regular(_) => INodeKind::Regular,
            Body::Device(d) => INodeKind::Device(d.kind()),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self.body, Body::Directory(_))
    }

    pub fn as_device(&self) -> Option<&Arc<dyn Device>> {
        match &self.body {
            Body::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn read_blocked(&self) -> bool {
        self.as_device().is_some_and(|d| d.read_blocked())
    }

    pub fn write_blocked(&self) -> bool {
        self.as_device().is_some_and(|d| d.write_blocked())
    }

    /// Append up to `max_lines` lines starting at line `offset`.
    /// Returns the number appended; 0 is end of file.
    pub async fn read(
        &self,
        path: &str,
        buffer: &mut Vec<String>,
        max_lines: usize,
        offset: usize,
    ) -> Result<usize, TermError> {
        match &self.body {
            Body::Directory(_) => Err(TermError::IsADirectory(path.to_string())),
            Body::Regular(lines) => {
                let lines = lines.lock().unwrap_or_else(|e| e.into_inner());
                let start = offset.min(lines.len());
                let end = start.saturating_add(max_lines).min(lines.len());
                buffer.extend_from_slice(&lines[start..end]);
                Ok(end - start)
            }
            Body::Device(d) => d.read(buffer, max_lines, offset).await,
        }
    }

    /// Write the lines of `buffer` at line `offset`, consuming them.
    pub async fn write(&self, path: &str, buffer: &mut Vec<String>, offset: usize) -> Result<usize, TermError> {
        match &self.body {
            Body::Directory(_) => Err(TermError::IsADirectory(path.to_string())),
            Body::Regular(lines) => {
                let mut lines = lines.lock().unwrap_or_else(|e| e.into_inner());
                let count = buffer.len();
                let start = offset.min(lines.len());
                let end = start.saturating_add(count).min(lines.len());
                lines.splice(start..end, buffer.drain(..));
                Ok(count)
            }
            Body::Device(d) => d.write(buffer, offset).await,
        }
    }

    /// Drop all lines of a regular file.
    pub fn truncate(&self) {
        if let Body::Regular(lines) = &self.body {
            lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }
    }

    /// Number of lines in a regular file.
    pub fn len(&self) -> usize {
        match &self.body {
            Body::Regular(lines) => lines.lock().unwrap_or_else(|e| e.into_inner()).len(),
            Body::Directory(entries) => entries.lock().unwrap_or_else(|e| e.into_inner()).len(),
            Body::Device(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn lines(&self) -> Vec<String> {
        match &self.body {
            Body::Regular(lines) => lines.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn child(&self, name: &str) -> Option<INodeRef> {
        match &self.body {
            Body::Directory(entries) => entries
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(name)
                .cloned(),
            _ => None,
        }
    }

    /// Add a child; false if the name is taken or this is not a directory.
    pub(crate) fn insert_child(&self, name: &str, node: INodeRef) -> bool {
        match &self.body {
            Body::Directory(entries) => {
                let mut entries = entries.lock().unwrap_or_else(|e| e.into_inner());
                if entries.contains_key(name) {
                    return false;
                }
                entries.insert(name.to_string(), node);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn remove_child(&self, name: &str) -> Option<INodeRef> {
        match &self.body {
            Body::Directory(entries) => entries
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(name),
            _ => None,
        }
    }

    /// Children in name order.
    pub fn entries(&self) -> Vec<(String, INodeRef)> {
        match &self.body {
            Body::Directory(entries) => entries
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .map(|(k, v)| (k.clone(), Arc::clone(v)))
                .collect(),
            _ => Vec::new(),
        }
    }
}
