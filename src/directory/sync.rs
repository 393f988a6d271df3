use super::model::{Collection, Visitor, VisitorDirectory};
use crate::error::StorageError;
use crate::events::{DoorwatchEvent, EventBus};
use crate::gate::Gate;
use crate::store::{FileRef, FolderRef, PhotoStore};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, error, info, warn};

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Configured root folder names of the two collections
#[derive(Debug, Clone)]
pub struct CollectionRoots {
    pub whitelist: String,
    pub intruders: String,
}

impl CollectionRoots {
    pub fn root_name(&self, collection: Collection) -> &str {
        match collection {
            Collection::Whitelist => &self.whitelist,
            Collection::Intruders => &self.intruders,
        }
    }
}

/// Result of a refresh request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Collection rebuilt; `skipped` folders had no usable photo
    Refreshed { count: usize, skipped: usize },
    /// Another refresh of the same collection was in flight; nothing was done
    AlreadyRefreshing,
    /// Storage failed; the previous snapshot was kept
    Failed { error: String },
}

/// Rebuilds the in-memory directory from the photo store on demand
pub struct DirectorySync {
    store: Arc<dyn PhotoStore>,
    directory: Arc<VisitorDirectory>,
    roots: CollectionRoots,
    event_bus: Arc<EventBus>,
    whitelist_gate: Gate,
    intruder_gate: Gate,
}

impl DirectorySync {
    pub fn new(
        store: Arc<dyn PhotoStore>,
        directory: Arc<VisitorDirectory>,
        roots: CollectionRoots,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            store,
            directory,
            roots,
            event_bus,
            whitelist_gate: Gate::new(),
            intruder_gate: Gate::new(),
        }
    }

    pub fn directory(&self) -> Arc<VisitorDirectory> {
        Arc::clone(&self.directory)
    }

    pub fn roots(&self) -> &CollectionRoots {
        &self.roots
    }

    pub fn is_refreshing(&self, collection: Collection) -> bool {
        self.gate(collection).is_busy()
    }

    pub async fn refresh_whitelist(&self) -> RefreshOutcome {
        self.refresh(Collection::Whitelist).await
    }

    pub async fn refresh_intruders(&self) -> RefreshOutcome {
        self.refresh(Collection::Intruders).await
    }

    fn gate(&self, collection: Collection) -> &Gate {
        match collection {
            Collection::Whitelist => &self.whitelist_gate,
            Collection::Intruders => &self.intruder_gate,
        }
    }

    /// Rebuild one collection unless it is already being rebuilt
    pub async fn refresh(&self, collection: Collection) -> RefreshOutcome {
        let Some(_pass) = self.gate(collection).try_enter() else {
            debug!("{} refresh already in flight, ignoring request", collection);
            return RefreshOutcome::AlreadyRefreshing;
        };

        match self.load_collection(collection).await {
            Ok((visitors, skipped)) => {
                let count = visitors.len();
                self.directory.replace(collection, visitors);
                info!(
                    "Refreshed {}: {} visitors ({} folders skipped)",
                    collection, count, skipped
                );

                let _ = self.event_bus.publish(DoorwatchEvent::DirectoryRefreshed {
                    collection,
                    count,
                    timestamp: SystemTime::now(),
                });

                RefreshOutcome::Refreshed { count, skipped }
            }
            Err(e) => {
                error!("Failed to refresh {}: {}", collection, e);
                let _ = self.event_bus.publish(DoorwatchEvent::SystemError {
                    component: "directory_sync".to_string(),
                    error: format!("{} refresh failed: {}", collection, e),
                });
                RefreshOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn load_collection(
        &self,
        collection: Collection,
    ) -> Result<(Vec<Visitor>, usize), StorageError> {
        let root = self.store.open_root(self.roots.root_name(collection)).await?;
        let folders = self.store.list_subfolders(&root).await?;

        let mut visitors = Vec::with_capacity(folders.len());
        let mut skipped = 0;

        for folder in folders {
            match self.representative_photo(&folder).await {
                Ok(Some(photo)) => {
                    let name = folder.name().to_string();
                    debug!("Loaded {} from {}", name, photo);
                    visitors.push(Visitor::new(name, photo, folder));
                }
                Ok(None) => {
                    warn!(
                        "Skipping {} entry '{}': folder holds no photos",
                        collection,
                        folder.name()
                    );
                    skipped += 1;
                }
                Err(e) => {
                    warn!(
                        "Skipping {} entry '{}': {}",
                        collection,
                        folder.name(),
                        e
                    );
                    skipped += 1;
                }
            }
        }

        Ok((visitors, skipped))
    }

    /// First photo of a folder, by file name
    async fn representative_photo(&self, folder: &FolderRef) -> Result<Option<FileRef>, StorageError> {
        let files = self.store.list_files(folder).await?;
        Ok(files
            .into_iter()
            .filter(|f| is_photo(f.name()))
            .min_by(|a, b| a.name().cmp(b.name())))
    }
}

fn is_photo(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            PHOTO_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}
