mod intruders;
mod model;
mod sync;

pub use intruders::{IntruderRecord, IntruderRecorder};
pub use model::{Collection, Snapshot, Visitor, VisitorDirectory};
pub use sync::{CollectionRoots, DirectorySync, RefreshOutcome};
