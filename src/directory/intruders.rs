use crate::error::StorageError;
use crate::store::{CollisionPolicy, FileRef, FolderRef, PhotoStore};
use std::sync::Arc;
use tracing::{debug, info};

const INTRUDER_PREFIX: &str = "intruder";

/// A newly persisted intruder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntruderRecord {
    pub name: String,
    pub folder: FolderRef,
    pub photo: FileRef,
}

/// Writes intruder folders into the intruder collection.
///
/// Names are sequential: the new folder is `intruder<N>` where `N` is the
/// number of intruder folders that exist when the record is written. When a
/// folder was deleted by hand that name is already taken; the recorder then
/// tries `N+1`, `N+2` and so on, never replacing an existing folder. There is
/// no reservation step, so two concurrent `record` calls could compute the
/// same name; callers must serialize them.
pub struct IntruderRecorder {
    store: Arc<dyn PhotoStore>,
    root_name: String,
}

impl IntruderRecorder {
    pub fn new(store: Arc<dyn PhotoStore>, root_name: impl Into<String>) -> Self {
        Self {
            store,
            root_name: root_name.into(),
        }
    }

    pub fn sequential_name(existing: usize) -> String {
        format!("{}{}", INTRUDER_PREFIX, existing)
    }

    /// Create the next intruder folder and move `photo` into it
    pub async fn record(&self, photo: &FileRef) -> Result<IntruderRecord, StorageError> {
        let root = self.store.open_root(&self.root_name).await?;
        let existing = self.store.list_subfolders(&root).await?.len();
        let (name, folder) = self.create_next_folder(&root, existing).await?;
        let photo = self.store.move_file(photo, &folder).await?;

        info!("Recorded intruder {} at {}", name, folder);
        Ok(IntruderRecord {
            name,
            folder,
            photo,
        })
    }

    /// Only `existing` folders can hold a candidate name, so the scan stops
    /// after `existing + 1` candidates.
    async fn create_next_folder(
        &self,
        root: &FolderRef,
        existing: usize,
    ) -> Result<(String, FolderRef), StorageError> {
        let mut index = existing;
        loop {
            let name = Self::sequential_name(index);
            match self
                .store
                .create_folder(root, &name, CollisionPolicy::FailIfExists)
                .await
            {
                Ok(folder) => return Ok((name, folder)),
                Err(StorageError::AlreadyExists { path }) if index < existing * 2 => {
                    debug!("Intruder folder {} already exists, trying next index", path);
                    index += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
