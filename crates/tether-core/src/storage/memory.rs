//! In-memory storage.

use std::collections::{HashMap, HashSet};
use std::io;

use parking_lot::RwLock;

use super::{FileStat, Storage};
use crate::error::StorageError;
use crate::path::{Namespace, ResolvedPath};

#[derive(Debug, Default)]
struct Files {
    entries: HashMap<(Namespace, String), Vec<u8>>,
    unreadable: HashSet<(Namespace, String)>,
}

/// Storage held in memory
///
/// Assets are provisioned with [`MemoryStorage::seed`], which bypasses the
/// read-only check. Entries marked with [`MemoryStorage::make_unreadable`]
/// still stat successfully but fail on read, which lets callers exercise
/// read failures after a successful enqueue.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: RwLock<Files>,
}

impl MemoryStorage {
    /// Create empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a file in any namespace, including `assets`
    pub fn seed(&self, namespace: Namespace, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files
            .write()
            .entries
            .insert((namespace, path.into()), content.into());
    }

    /// Make reads of an existing or future entry fail with an I/O error
    pub fn make_unreadable(&self, namespace: Namespace, path: impl Into<String>) {
        self.files.write().unreadable.insert((namespace, path.into()));
    }

    /// Current content of a file, if stored
    #[must_use]
    pub fn get(&self, namespace: Namespace, path: &str) -> Option<Vec<u8>> {
        self.files
            .read()
            .entries
            .get(&(namespace, path.to_string()))
            .cloned()
    }

    /// Number of stored files across both namespaces
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().entries.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn key(path: &ResolvedPath) -> (Namespace, String) {
    (path.namespace, path.path.clone())
}

impl Storage for MemoryStorage {
    fn stat(&self, path: &ResolvedPath) -> Result<Option<FileStat>, StorageError> {
        Ok(self.files.read().entries.get(&key(path)).map(|content| FileStat {
            size: content.len() as u64,
        }))
    }

    fn read_all(&self, path: &ResolvedPath) -> Result<Vec<u8>, StorageError> {
        let files = self.files.read();
        let key = key(path);
        if files.unreadable.contains(&key) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{path} is unreadable"),
            )));
        }
        files
            .entries
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn write_all(&self, path: &ResolvedPath, content: &[u8]) -> Result<(), StorageError> {
        if path.namespace.is_read_only() {
            return Err(StorageError::ReadOnly(path.namespace));
        }
        self.files.write().entries.insert(key(path), content.to_vec());
        Ok(())
    }
}
