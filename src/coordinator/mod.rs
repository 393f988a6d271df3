mod actor;
mod cycle;
mod types;

pub use actor::{CoordinatorActor, EntryTrigger};
pub use cycle::{Collaborators, EntryCoordinator};
pub use types::{CoordinatorState, EntryOutcome, NotReadyReason, TriggerSource};
