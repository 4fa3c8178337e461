//! # Tether Files
//!
//! Filesystem storage for Tether.
//!
//! [`DirStorage`] maps each namespace onto a directory: `assets://a/b.txt`
//! is `<assets_root>/a/b.txt` and `data://a/b.txt` is `<data_root>/a/b.txt`.
//! Paths are confined to their root; absolute paths and `..` components are
//! rejected with [`StorageError::OutsideRoot`].

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tether_core::{FileStat, Namespace, ResolvedPath, Storage, StorageError};

/// Storage backed by two directories
#[derive(Debug, Clone)]
pub struct DirStorage {
    assets_root: PathBuf,
    data_root: PathBuf,
}

impl DirStorage {
    /// Create storage over the given namespace roots
    ///
    /// The roots are not created or checked here; the data root is created
    /// on first write.
    pub fn new(assets_root: impl Into<PathBuf>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
            data_root: data_root.into(),
        }
    }

    /// Root directory of a namespace
    #[must_use]
    pub fn root(&self, namespace: Namespace) -> &Path {
        match namespace {
            Namespace::Assets => &self.assets_root,
            Namespace::Data => &self.data_root,
        }
    }

    /// Filesystem location of a resolved path
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OutsideRoot`] if the path is absolute or
    /// contains `..`.
    pub fn locate(&self, path: &ResolvedPath) -> Result<PathBuf, StorageError> {
        let relative = Path::new(&path.path);
        let confined = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !confined {
            return Err(StorageError::OutsideRoot(path.to_string()));
        }
        Ok(self.root(path.namespace).join(relative))
    }
}

impl Storage for DirStorage {
    fn stat(&self, path: &ResolvedPath) -> Result<Option<FileStat>, StorageError> {
        let file = self.locate(path)?;
        match fs::metadata(&file) {
            Ok(meta) if meta.is_file() => Ok(Some(FileStat { size: meta.len() })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_all(&self, path: &ResolvedPath) -> Result<Vec<u8>, StorageError> {
        let file = self.locate(path)?;
        fs::read(&file).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(e),
        })
    }

    fn write_all(&self, path: &ResolvedPath, content: &[u8]) -> Result<(), StorageError> {
        if path.namespace.is_read_only() {
            return Err(StorageError::ReadOnly(path.namespace));
        }

        let file = self.locate(path)?;
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent)?;
        }
        // Creates the file if absent and truncates it otherwise
        fs::write(&file, content)?;

        tracing::debug!(
            file = %file.display(),
            size = content.len(),
            "Wrote file"
        );
        Ok(())
    }
}
