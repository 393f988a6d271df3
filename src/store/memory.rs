use super::{validate_entry_name, CollisionPolicy, FileRef, FolderRef, PhotoStore};
use crate::error::StorageError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Number of calls made against a `MemoryPhotoStore`, per operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOperationCounts {
    pub open_root: usize,
    pub list_subfolders: usize,
    pub create_folder: usize,
    pub list_files: usize,
    pub move_file: usize,
    pub write_file: usize,
    pub remove_file: usize,
}

impl StoreOperationCounts {
    pub fn total(&self) -> usize {
        self.open_root
            + self.list_subfolders
            + self.create_folder
            + self.list_files
            + self.move_file
            + self.write_file
            + self.remove_file
    }
}

#[derive(Debug, Default)]
struct MemoryTree {
    folders: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryTree {
    fn require_folder(&self, path: &Path) -> Result<(), StorageError> {
        if self.folders.contains(path) {
            Ok(())
        } else {
            Err(StorageError::FolderNotFound {
                path: path.display().to_string(),
            })
        }
    }

    fn taken(&self, path: &Path) -> bool {
        self.folders.contains(path) || self.files.contains_key(path)
    }
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Volatile photo store that keeps the folder tree in memory.
///
/// Used for dry runs and tests; every operation is counted so callers can
/// assert on how the store was driven.
#[derive(Debug)]
pub struct MemoryPhotoStore {
    base: PathBuf,
    tree: Mutex<MemoryTree>,
    counts: Mutex<StoreOperationCounts>,
    fail_moves: AtomicBool,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        let base = PathBuf::from("/memory");
        let mut tree = MemoryTree::default();
        tree.folders.insert(base.clone());
        Self {
            base,
            tree: Mutex::new(tree),
            counts: Mutex::new(StoreOperationCounts::default()),
            fail_moves: AtomicBool::new(false),
        }
    }

    pub fn operation_counts(&self) -> StoreOperationCounts {
        self.counts.lock().clone()
    }

    pub fn reset_operation_counts(&self) {
        *self.counts.lock() = StoreOperationCounts::default();
    }

    /// Make every following `move_file` fail as an IO error
    pub fn set_move_failure(&self, fail: bool) {
        self.fail_moves.store(fail, Ordering::Release);
    }

    pub fn read_file(&self, file: &FileRef) -> Option<Vec<u8>> {
        self.tree.lock().files.get(file.path()).cloned()
    }

    pub fn contains_file(&self, file: &FileRef) -> bool {
        self.tree.lock().files.contains_key(file.path())
    }
}

impl Default for MemoryPhotoStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn open_root(&self, name: &str) -> Result<FolderRef, StorageError> {
        self.counts.lock().open_root += 1;
        validate_entry_name(name)?;

        let path = self.base.join(name);
        self.tree.lock().folders.insert(path.clone());
        Ok(FolderRef::new(name, path))
    }

    async fn list_subfolders(&self, folder: &FolderRef) -> Result<Vec<FolderRef>, StorageError> {
        self.counts.lock().list_subfolders += 1;

        let tree = self.tree.lock();
        tree.require_folder(folder.path())?;
        Ok(tree
            .folders
            .iter()
            .filter(|p| p.parent() == Some(folder.path()))
            .map(|p| FolderRef::new(entry_name(p), p.clone()))
            .collect())
    }

    async fn create_folder(
        &self,
        parent: &FolderRef,
        name: &str,
        policy: CollisionPolicy,
    ) -> Result<FolderRef, StorageError> {
        self.counts.lock().create_folder += 1;
        validate_entry_name(name)?;

        let mut tree = self.tree.lock();
        tree.require_folder(parent.path())?;

        let path = parent.path().join(name);
        if tree.folders.contains(&path) {
            return match policy {
                CollisionPolicy::OpenIfExists => Ok(FolderRef::new(name, path)),
                CollisionPolicy::FailIfExists => Err(StorageError::AlreadyExists {
                    path: path.display().to_string(),
                }),
            };
        }
        if tree.files.contains_key(&path) {
            return Err(StorageError::AlreadyExists {
                path: path.display().to_string(),
            });
        }

        tree.folders.insert(path.clone());
        Ok(FolderRef::new(name, path))
    }

    async fn list_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>, StorageError> {
        self.counts.lock().list_files += 1;

        let tree = self.tree.lock();
        tree.require_folder(folder.path())?;
        Ok(tree
            .files
            .keys()
            .filter(|p| p.parent() == Some(folder.path()))
            .map(|p| FileRef::new(entry_name(p), p.clone()))
            .collect())
    }

    async fn move_file(&self, file: &FileRef, dest: &FolderRef) -> Result<FileRef, StorageError> {
        self.counts.lock().move_file += 1;
        if self.fail_moves.load(Ordering::Acquire) {
            return Err(StorageError::io(
                file.path().display().to_string(),
                std::io::Error::new(std::io::ErrorKind::Other, "injected move failure"),
            ));
        }

        let mut tree = self.tree.lock();
        tree.require_folder(dest.path())?;

        let target = dest.path().join(file.name());
        if tree.taken(&target) {
            return Err(StorageError::AlreadyExists {
                path: target.display().to_string(),
            });
        }

        let data = tree
            .files
            .remove(file.path())
            .ok_or_else(|| StorageError::FileNotFound {
                path: file.path().display().to_string(),
            })?;
        tree.files.insert(target.clone(), data);

        Ok(FileRef::new(file.name(), target))
    }

    async fn write_file(
        &self,
        folder: &FolderRef,
        name: &str,
        data: &[u8],
    ) -> Result<FileRef, StorageError> {
        self.counts.lock().write_file += 1;
        validate_entry_name(name)?;

        let mut tree = self.tree.lock();
        tree.require_folder(folder.path())?;

        let path = folder.path().join(name);
        if tree.taken(&path) {
            return Err(StorageError::AlreadyExists {
                path: path.display().to_string(),
            });
        }

        tree.files.insert(path.clone(), data.to_vec());
        Ok(FileRef::new(name, path))
    }

    async fn remove_file(&self, file: &FileRef) -> Result<(), StorageError> {
        self.counts.lock().remove_file += 1;

        self.tree
            .lock()
            .files
            .remove(file.path())
            .map(|_| ())
            .ok_or_else(|| StorageError::FileNotFound {
                path: file.path().display().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_nested_folders_are_not_listed_as_children() {
        let store = MemoryPhotoStore::new();
        let root = store.open_root("whitelist").await.unwrap();
        let alice = store
            .create_folder(&root, "alice", CollisionPolicy::FailIfExists)
            .await
            .unwrap();
        store
            .create_folder(&alice, "archive", CollisionPolicy::FailIfExists)
            .await
            .unwrap();

        let children = store.list_subfolders(&root).await.unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "alice");
    }

    #[tokio::test]
    async fn test_move_and_counts() {
        let store = MemoryPhotoStore::new();
        let staging = store.open_root("captures").await.unwrap();
        let root = store.open_root("intruders").await.unwrap();
        let dest = store
            .create_folder(&root, "intruder0", CollisionPolicy::FailIfExists)
            .await
            .unwrap();

        let staged = store.write_file(&staging, "a.jpg", b"jpeg").await.unwrap();
        let moved = store.move_file(&staged, &dest).await.unwrap();

        assert!(!store.contains_file(&staged));
        assert_eq!(store.read_file(&moved), Some(b"jpeg".to_vec()));

        let counts = store.operation_counts();
        assert_eq!(counts.move_file, 1);
        assert_eq!(counts.create_folder, 1);
        assert_eq!(counts.total(), 5);

        let err = store.move_file(&staged, &dest).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
    }
}
