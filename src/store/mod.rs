//! Folder-per-person photo storage.
//!
//! The store is the source of truth for both visitor collections. Each
//! collection is a root folder holding one subfolder per visitor; the
//! subfolder name is the visitor's identity and its files are their photos.

mod local;
mod memory;

pub use local::LocalPhotoStore;
pub use memory::{MemoryPhotoStore, StoreOperationCounts};

use crate::error::StorageError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// Handle to a folder inside the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderRef {
    name: String,
    path: PathBuf,
}

impl FolderRef {
    pub(crate) fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Folder name as the store reports it
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for FolderRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Handle to a file inside the store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRef {
    name: String,
    path: PathBuf,
}

impl FileRef {
    pub(crate) fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// What `create_folder` does when the name is taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Return the existing folder
    OpenIfExists,
    /// Fail with `StorageError::AlreadyExists`
    FailIfExists,
}

/// Folder-oriented photo storage backend.
///
/// Listings are returned sorted by name so callers see a stable order
/// regardless of what the underlying medium reports.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Open a top-level folder, creating it when missing
    async fn open_root(&self, name: &str) -> Result<FolderRef, StorageError>;

    async fn list_subfolders(&self, folder: &FolderRef) -> Result<Vec<FolderRef>, StorageError>;

    async fn create_folder(
        &self,
        parent: &FolderRef,
        name: &str,
        policy: CollisionPolicy,
    ) -> Result<FolderRef, StorageError>;

    async fn list_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>, StorageError>;

    /// Move a file into `dest`, keeping its name. The source no longer exists afterwards.
    async fn move_file(&self, file: &FileRef, dest: &FolderRef) -> Result<FileRef, StorageError>;

    /// Write a new file, failing if one with the same name exists
    async fn write_file(
        &self,
        folder: &FolderRef,
        name: &str,
        data: &[u8],
    ) -> Result<FileRef, StorageError>;

    async fn remove_file(&self, file: &FileRef) -> Result<(), StorageError>;
}

/// Reject names that would escape their parent folder
pub(crate) fn validate_entry_name(name: &str) -> Result<(), StorageError> {
    let reason = if name.trim().is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name refers to a relative directory")
    } else if name.contains('/') || name.contains('\\') || name.contains('\0') {
        Some("name contains a path separator")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(StorageError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_validation() {
        assert!(validate_entry_name("intruder3").is_ok());
        assert!(validate_entry_name("Dorm Room Monitor Intruders").is_ok());
        assert!(validate_entry_name("").is_err());
        assert!(validate_entry_name("..").is_err());
        assert!(validate_entry_name("a/b").is_err());
        assert!(validate_entry_name("a\\b").is_err());
    }
}
