use crate::store::{FileRef, FolderRef};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The two visitor collections kept by the directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    Whitelist,
    Intruders,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Whitelist => write!(f, "whitelist"),
            Collection::Intruders => write!(f, "intruders"),
        }
    }
}

/// One known person or one recorded intruder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visitor {
    name: String,
    reference_image: FileRef,
    storage_location: FolderRef,
}

impl Visitor {
    pub fn new(name: impl Into<String>, reference_image: FileRef, storage_location: FolderRef) -> Self {
        Self {
            name: name.into(),
            reference_image,
            storage_location,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Representative photo used for display
    pub fn reference_image(&self) -> &FileRef {
        &self.reference_image
    }

    /// Folder holding every photo of this visitor
    pub fn storage_location(&self) -> &FolderRef {
        &self.storage_location
    }
}

/// Immutable view of one collection at the time it was taken
pub type Snapshot = Arc<Vec<Visitor>>;

/// In-memory cache of the whitelist and intruder collections.
///
/// Readers get cheap `Arc` snapshots; a refresh swaps the whole collection
/// at once so a reader never observes a half-rebuilt list.
#[derive(Debug, Default)]
pub struct VisitorDirectory {
    whitelist: RwLock<Snapshot>,
    intruders: RwLock<Snapshot>,
}

impl VisitorDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, collection: Collection) -> &RwLock<Snapshot> {
        match collection {
            Collection::Whitelist => &self.whitelist,
            Collection::Intruders => &self.intruders,
        }
    }

    pub fn snapshot(&self, collection: Collection) -> Snapshot {
        Arc::clone(&self.slot(collection).read())
    }

    pub fn whitelist(&self) -> Snapshot {
        self.snapshot(Collection::Whitelist)
    }

    pub fn intruders(&self) -> Snapshot {
        self.snapshot(Collection::Intruders)
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.slot(collection).read().len()
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    pub fn find(&self, collection: Collection, name: &str) -> Option<Visitor> {
        self.slot(collection)
            .read()
            .iter()
            .find(|v| v.name() == name)
            .cloned()
    }

    pub(crate) fn replace(&self, collection: Collection, visitors: Vec<Visitor>) {
        *self.slot(collection).write() = Arc::new(visitors);
    }
}
