//! Scheme-qualified paths.
//!
//! Every path exchanged with consumers or peers carries one of two scheme
//! prefixes selecting a storage namespace: `assets://` for the read-only
//! bundled namespace and `data://` for the read-write user namespace.
//! Matching is exact and case-sensitive. The remainder is passed to storage
//! untouched; `..` and repeated separators are storage's concern.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

/// Scheme prefix of the read-only bundled namespace
pub const ASSETS_SCHEME: &str = "assets://";

/// Scheme prefix of the read-write user namespace
pub const DATA_SCHEME: &str = "data://";

/// Storage namespace selected by a path scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Read-only bundled files
    Assets,
    /// Read-write user files
    Data,
}

impl Namespace {
    /// Scheme prefix for this namespace, including `://`
    #[must_use]
    pub const fn scheme(self) -> &'static str {
        match self {
            Self::Assets => ASSETS_SCHEME,
            Self::Data => DATA_SCHEME,
        }
    }

    /// Whether writes into this namespace are refused
    #[must_use]
    pub const fn is_read_only(self) -> bool {
        matches!(self, Self::Assets)
    }

    /// Prefix a namespace-relative path with this namespace's scheme
    #[must_use]
    pub fn qualify(self, path: &str) -> String {
        format!("{}{}", self.scheme(), path)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assets => write!(f, "assets"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// A path split into its namespace and namespace-relative remainder
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedPath {
    /// Namespace selected by the scheme
    pub namespace: Namespace,
    /// Path with the scheme stripped
    pub path: String,
}

impl ResolvedPath {
    /// Create a resolved path from its parts
    pub fn new(namespace: Namespace, path: impl Into<String>) -> Self {
        Self {
            namespace,
            path: path.into(),
        }
    }

    /// Final component of the path
    ///
    /// Trailing separators are ignored, so `dir/sub/` yields `sub`.
    #[must_use]
    pub fn file_name(&self) -> &str {
        base_name(&self.path)
    }

    /// The path with its scheme put back, e.g. `data://notes/a.txt`
    #[must_use]
    pub fn qualified(&self) -> String {
        self.namespace.qualify(&self.path)
    }
}

impl fmt::Display for ResolvedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.namespace.scheme(), self.path)
    }
}

impl FromStr for ResolvedPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve(s)
    }
}

/// Classify a user-supplied path into its namespace and relative path.
///
/// Surrounding whitespace is trimmed before the prefix is matched.
///
/// # Errors
///
/// Returns [`PathError::InvalidPath`] if the trimmed input starts with
/// neither `assets://` nor `data://`.
pub fn resolve(raw: &str) -> Result<ResolvedPath, PathError> {
    let trimmed = raw.trim();

    if let Some(rest) = trimmed.strip_prefix(ASSETS_SCHEME) {
        Ok(ResolvedPath::new(Namespace::Assets, rest))
    } else if let Some(rest) = trimmed.strip_prefix(DATA_SCHEME) {
        Ok(ResolvedPath::new(Namespace::Data, rest))
    } else {
        Err(PathError::InvalidPath(raw.to_string()))
    }
}

/// Last `/`-separated component, ignoring trailing separators
fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_data() {
        let resolved = resolve("data://note.txt").unwrap();
        assert_eq!(resolved.namespace, Namespace::Data);
        assert_eq!(resolved.path, "note.txt");
    }

    #[test]
    fn test_resolve_assets_nested() {
        let resolved = resolve("assets://images/icon.png").unwrap();
        assert_eq!(resolved.namespace, Namespace::Assets);
        assert_eq!(resolved.path, "images/icon.png");
        assert_eq!(resolved.file_name(), "icon.png");
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        let resolved = resolve("  \tdata://a/b.bin \n").unwrap();
        assert_eq!(resolved.namespace, Namespace::Data);
        assert_eq!(resolved.path, "a/b.bin");
    }

    #[test]
    fn test_resolve_rejects_other_schemes() {
        for raw in [
            "ftp://x",
            "note.txt",
            "",
            "   ",
            "DATA://note.txt",
            "Assets://x",
            "data:/note.txt",
            "data//note.txt",
            " file://data://x",
        ] {
            assert_eq!(
                resolve(raw),
                Err(PathError::InvalidPath(raw.to_string())),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve_does_not_normalize() {
        let resolved = resolve("data://../up//twice").unwrap();
        assert_eq!(resolved.path, "../up//twice");
    }

    #[test]
    fn test_empty_remainder() {
        let resolved = resolve("data://").unwrap();
        assert_eq!(resolved.path, "");
        assert_eq!(resolved.file_name(), "");
    }

    #[test]
    fn test_file_name() {
        assert_eq!(base_name("a/b/c.txt"), "c.txt");
        assert_eq!(base_name("c.txt"), "c.txt");
        assert_eq!(base_name("dir/sub/"), "sub");
        assert_eq!(base_name("/abs.txt"), "abs.txt");
    }

    #[test]
    fn test_qualified_roundtrip() {
        let resolved: ResolvedPath = " assets://fonts/a.ttf".parse().unwrap();
        assert_eq!(resolved.qualified(), "assets://fonts/a.ttf");
        assert_eq!(resolved.to_string(), "assets://fonts/a.ttf");
        assert_eq!(resolve(&resolved.qualified()).unwrap(), resolved);
    }

    #[test]
    fn test_namespace_properties() {
        assert!(Namespace::Assets.is_read_only());
        assert!(!Namespace::Data.is_read_only());
        assert_eq!(Namespace::Data.qualify("x"), "data://x");
        assert_eq!(Namespace::Assets.to_string(), "assets");
    }
}
