pub mod queue;
pub mod sync;

pub use queue::OfflineQueue;
pub use sync::{Submission, SyncCoordinator, SyncReport, SyncStatus};
