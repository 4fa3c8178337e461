//! Two-namespace file storage.
//!
//! Storage is keyed by [`ResolvedPath`]: a namespace plus a path relative to
//! that namespace's root. The `assets` namespace is read-only; writes into it
//! fail with [`StorageError::ReadOnly`]. Path normalization, including any
//! handling of `..`, is up to the implementation.

mod memory;

pub use memory::MemoryStorage;

use crate::error::StorageError;
use crate::path::ResolvedPath;

/// Metadata returned by [`Storage::stat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    /// Size in bytes
    pub size: u64,
}

/// File storage split into the `assets` and `data` namespaces
pub trait Storage: Send + Sync {
    /// Look up a file, returning `None` if nothing is stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the lookup itself fails.
    fn stat(&self, path: &ResolvedPath) -> Result<Option<FileStat>, StorageError>;

    /// Read the whole file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the file is missing, or another
    /// [`StorageError`] if it cannot be read.
    fn read_all(&self, path: &ResolvedPath) -> Result<Vec<u8>, StorageError>;

    /// Create the file if absent and replace its content.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ReadOnly`] for the `assets` namespace, or
    /// another [`StorageError`] if the write fails.
    fn write_all(&self, path: &ResolvedPath, content: &[u8]) -> Result<(), StorageError>;
}
