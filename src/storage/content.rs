// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Paperlink

//! File content storage.
//!
//! Document bytes live outside the record database, addressed by the
//! record's `storage_key` (`docs/{id}/{filename}` for merchant uploads,
//! `customer-uploads/{id}/{filename}` for portal uploads). The filesystem
//! backend writes through a temp file and renames, so a crash mid-write
//! never leaves a half-written document behind the key.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use super::{ContentStore, StorageError, StorageResult};

/// Filesystem-backed [`ContentStore`] rooted at a single directory.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open (and create if needed) the content root.
    pub fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve a key against the root, rejecting absolute paths and any
    /// component that is not a plain name.
    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let traversal = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_)));
        if key.is_empty() || relative.is_absolute() || traversal {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ContentStore for FsContentStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(bytes)?;
            file.flush()?;
        }
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("content {key}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Missing content is treated as already deleted, so the reaper can
    /// re-run safely.
    fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.resolve(key)?.is_file())
    }
}

/// Volatile [`ContentStore`] for tests and `DATA_DIR`-less development.
#[derive(Default)]
pub struct MemoryContentStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContentStore for MemoryContentStore {
    fn put(&self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("content {key}")))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(key);
        Ok(())
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn put_and_get_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::open(temp.path()).unwrap();

        store.put("docs/abc/invoice.pdf", b"pdf bytes").unwrap();
        assert_eq!(store.get("docs/abc/invoice.pdf").unwrap(), b"pdf bytes");
    }

    #[test]
    fn get_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::open(temp.path()).unwrap();

        assert!(matches!(
            store.get("docs/none/missing.pdf"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn delete_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::open(temp.path()).unwrap();

        store.put("docs/abc/a.pdf", b"x").unwrap();
        assert!(store.exists("docs/abc/a.pdf").unwrap());
        store.delete("docs/abc/a.pdf").unwrap();
        store.delete("docs/abc/a.pdf").unwrap();
        assert!(!store.exists("docs/abc/a.pdf").unwrap());
        assert!(store.get("docs/abc/a.pdf").is_err());
    }

    #[test]
    fn traversal_keys_are_rejected() {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::open(temp.path()).unwrap();

        for key in ["../escape.pdf", "/etc/passwd", "docs/../../x", ""] {
            assert!(
                matches!(store.put(key, b"x"), Err(StorageError::InvalidKey(_))),
                "key {key:?} should be rejected"
            );
        }
    }

    #[test]
    fn overwrite_replaces_content() {
        let temp = TempDir::new().unwrap();
        let store = FsContentStore::open(temp.path()).unwrap();

        store.put("docs/abc/v.pdf", b"one").unwrap();
        store.put("docs/abc/v.pdf", b"two").unwrap();
        assert_eq!(store.get("docs/abc/v.pdf").unwrap(), b"two");
    }

    #[test]
    fn memory_store_roundtrip() {
        let store = MemoryContentStore::new();
        store.put("docs/abc/a.pdf", b"bytes").unwrap();
        assert!(store.exists("docs/abc/a.pdf").unwrap());
        assert_eq!(store.get("docs/abc/a.pdf").unwrap(), b"bytes");
        store.delete("docs/abc/a.pdf").unwrap();
        assert!(!store.exists("docs/abc/a.pdf").unwrap());
        assert!(matches!(
            store.get("docs/abc/a.pdf"),
            Err(StorageError::NotFound(_))
        ));
    }
}
