use super::{validate_entry_name, CollisionPolicy, FileRef, FolderRef, PhotoStore};
use crate::error::StorageError;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Photo store backed by a directory tree on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalPhotoStore {
    base: PathBuf,
}

impl LocalPhotoStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn display(path: &Path) -> String {
        path.display().to_string()
    }

    async fn require_dir(path: &Path) -> Result<(), StorageError> {
        match fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(StorageError::FolderNotFound {
                path: Self::display(path),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::FolderNotFound {
                path: Self::display(path),
            }),
            Err(e) => Err(StorageError::io(Self::display(path), e)),
        }
    }

    /// Read a directory, returning (name, path, is_dir) entries sorted by name
    async fn read_entries(path: &Path) -> Result<Vec<(String, PathBuf, bool)>, StorageError> {
        Self::require_dir(path).await?;

        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| StorageError::io(Self::display(path), e))?;

        let mut listed = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(Self::display(path), e))?
        {
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    warn!("Skipping unreadable entry {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping entry with non UTF-8 name in {}", path.display());
                continue;
            };

            if name.starts_with('.') {
                continue;
            }

            listed.push((name, entry.path(), file_type.is_dir()));
        }

        listed.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(listed)
    }
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn open_root(&self, name: &str) -> Result<FolderRef, StorageError> {
        validate_entry_name(name)?;
        let path = self.base.join(name);

        fs::create_dir_all(&path)
            .await
            .map_err(|e| StorageError::io(Self::display(&path), e))?;

        debug!("Opened root folder {}", path.display());
        Ok(FolderRef::new(name, path))
    }

    async fn list_subfolders(&self, folder: &FolderRef) -> Result<Vec<FolderRef>, StorageError> {
        let entries = Self::read_entries(folder.path()).await?;
        Ok(entries
            .into_iter()
            .filter(|(_, _, is_dir)| *is_dir)
            .map(|(name, path, _)| FolderRef::new(name, path))
            .collect())
    }

    async fn create_folder(
        &self,
        parent: &FolderRef,
        name: &str,
        policy: CollisionPolicy,
    ) -> Result<FolderRef, StorageError> {
        validate_entry_name(name)?;
        Self::require_dir(parent.path()).await?;

        let path = parent.path().join(name);
        match fs::create_dir(&path).await {
            Ok(()) => {
                info!("Created folder {}", path.display());
                Ok(FolderRef::new(name, path))
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => match policy {
                CollisionPolicy::OpenIfExists => {
                    Self::require_dir(&path).await?;
                    Ok(FolderRef::new(name, path))
                }
                CollisionPolicy::FailIfExists => Err(StorageError::AlreadyExists {
                    path: Self::display(&path),
                }),
            },
            Err(e) => Err(StorageError::io(Self::display(&path), e)),
        }
    }

    async fn list_files(&self, folder: &FolderRef) -> Result<Vec<FileRef>, StorageError> {
        let entries = Self::read_entries(folder.path()).await?;
        Ok(entries
            .into_iter()
            .filter(|(_, _, is_dir)| !*is_dir)
            .map(|(name, path, _)| FileRef::new(name, path))
            .collect())
    }

    async fn move_file(&self, file: &FileRef, dest: &FolderRef) -> Result<FileRef, StorageError> {
        Self::require_dir(dest.path()).await?;

        let target = dest.path().join(file.name());
        if fs::try_exists(&target)
            .await
            .map_err(|e| StorageError::io(Self::display(&target), e))?
        {
            return Err(StorageError::AlreadyExists {
                path: Self::display(&target),
            });
        }

        match fs::rename(file.path(), &target).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::FileNotFound {
                    path: Self::display(file.path()),
                });
            }
            Err(e) => {
                // EXDEV: source and destination on different filesystems
                debug!(
                    "Rename of {} failed ({}), falling back to copy",
                    file.path().display(),
                    e
                );
                fs::copy(file.path(), &target)
                    .await
                    .map_err(|e| StorageError::io(Self::display(&target), e))?;
                fs::remove_file(file.path())
                    .await
                    .map_err(|e| StorageError::io(Self::display(file.path()), e))?;
            }
        }

        debug!("Moved {} to {}", file.path().display(), target.display());
        Ok(FileRef::new(file.name(), target))
    }

    async fn write_file(
        &self,
        folder: &FolderRef,
        name: &str,
        data: &[u8],
    ) -> Result<FileRef, StorageError> {
        validate_entry_name(name)?;
        Self::require_dir(folder.path()).await?;

        let path = folder.path().join(name);
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::AlreadyExists {
                    path: Self::display(&path),
                });
            }
            Err(e) => return Err(StorageError::io(Self::display(&path), e)),
        };

        use tokio::io::AsyncWriteExt;
        file.write_all(data)
            .await
            .map_err(|e| StorageError::io(Self::display(&path), e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::io(Self::display(&path), e))?;

        Ok(FileRef::new(name, path))
    }

    async fn remove_file(&self, file: &FileRef) -> Result<(), StorageError> {
        match fs::remove_file(file.path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::FileNotFound {
                path: Self::display(file.path()),
            }),
            Err(e) => Err(StorageError::io(Self::display(file.path()), e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn store_with_root() -> (TempDir, LocalPhotoStore, FolderRef) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalPhotoStore::new(temp_dir.path());
        let root = store.open_root("intruders").await.unwrap();
        (temp_dir, store, root)
    }

    #[tokio::test]
    async fn test_open_root_is_idempotent() {
        let (_temp_dir, store, root) = store_with_root().await;
        let again = store.open_root("intruders").await.unwrap();
        assert_eq!(root, again);
        assert!(root.path().is_dir());
    }

    #[tokio::test]
    async fn test_listing_is_sorted_and_split_by_kind() {
        let (_temp_dir, store, root) = store_with_root().await;

        for name in ["intruder2", "intruder0", "intruder1"] {
            store
                .create_folder(&root, name, CollisionPolicy::FailIfExists)
                .await
                .unwrap();
        }
        store.write_file(&root, "stray.jpg", b"x").await.unwrap();

        let folders = store.list_subfolders(&root).await.unwrap();
        let names: Vec<&str> = folders.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["intruder0", "intruder1", "intruder2"]);

        let files = store.list_files(&root).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name(), "stray.jpg");
    }

    #[tokio::test]
    async fn test_create_folder_collision_policies() {
        let (_temp_dir, store, root) = store_with_root().await;

        store
            .create_folder(&root, "intruder0", CollisionPolicy::FailIfExists)
            .await
            .unwrap();

        let err = store
            .create_folder(&root, "intruder0", CollisionPolicy::FailIfExists)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));

        let opened = store
            .create_folder(&root, "intruder0", CollisionPolicy::OpenIfExists)
            .await
            .unwrap();
        assert_eq!(opened.name(), "intruder0");
    }

    #[tokio::test]
    async fn test_move_file_removes_source() {
        let (_temp_dir, store, root) = store_with_root().await;
        let staging = store.open_root("captures").await.unwrap();
        let dest = store
            .create_folder(&root, "intruder0", CollisionPolicy::FailIfExists)
            .await
            .unwrap();

        let staged = store
            .write_file(&staging, "capture.jpg", b"jpeg bytes")
            .await
            .unwrap();
        let moved = store.move_file(&staged, &dest).await.unwrap();

        assert!(!staged.path().exists());
        assert_eq!(std::fs::read(moved.path()).unwrap(), b"jpeg bytes");
        assert!(store.list_files(&staging).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_move_file_refuses_to_overwrite() {
        let (_temp_dir, store, root) = store_with_root().await;
        let staging = store.open_root("captures").await.unwrap();

        store.write_file(&root, "capture.jpg", b"old").await.unwrap();
        let staged = store.write_file(&staging, "capture.jpg", b"new").await.unwrap();

        let err = store.move_file(&staged, &root).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists { .. }));
        assert!(staged.path().exists());
    }

    #[tokio::test]
    async fn test_missing_folder_is_reported() {
        let (_temp_dir, store, root) = store_with_root().await;
        let ghost = FolderRef::new("ghost", root.path().join("ghost"));

        let err = store.list_subfolders(&ghost).await.unwrap_err();
        assert!(matches!(err, StorageError::FolderNotFound { .. }));
    }
}
