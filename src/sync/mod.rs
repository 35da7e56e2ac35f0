pub mod archive;
pub mod ignore_set;
pub mod synchronizer;
pub mod watcher;

pub use archive::ArchiveSnapshot;
pub use ignore_set::IgnoreSet;
pub use synchronizer::{ExerciseSynchronizer, FileEvent, FileEventHandler, FileEventKind, SyncOutcome};
pub use watcher::FolderWatcher;
