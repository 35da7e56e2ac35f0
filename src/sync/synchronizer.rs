use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::client::TeachingApi;
use crate::error::AppError;
use crate::handler::ErrorHandler;
use crate::models::{DESCRIPTOR_FILE_NAME, ExerciseDescriptor};
use crate::sync::archive::{ArchiveSnapshot, archive_key};
use crate::sync::ignore_set::IgnoreSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Created,
    Modified,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileEventKind) -> Self {
        Self { path: path.into(), kind }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Filtered out: outside the folder, the descriptor, ignored, or a directory.
    Discarded,
    Uploaded,
    UploadFailed,
    /// The file could not be read; nothing was uploaded.
    ReadFailed,
}

/// Receiver of file-system events, one method per event kind.
#[async_trait]
pub trait FileEventHandler: Send {
    async fn on_created(&mut self, path: &Path) -> SyncOutcome;
    async fn on_modified(&mut self, path: &Path) -> SyncOutcome;
    async fn on_deleted(&mut self, path: &Path) -> SyncOutcome;

    async fn on_file_event(&mut self, event: FileEvent) -> SyncOutcome {
        match event.kind {
            FileEventKind::Created => self.on_created(&event.path).await,
            FileEventKind::Modified => self.on_modified(&event.path).await,
            FileEventKind::Deleted => self.on_deleted(&event.path).await,
        }
    }
}

/// Keeps the server copy of one exercise folder in step with local edits.
///
/// Every accepted event mutates the in-memory snapshot and uploads the whole
/// snapshot. Failed uploads leave the snapshot as is, so the next upload
/// still carries every edit made in between.
pub struct ExerciseSynchronizer {
    exercise_id: i64,
    root: PathBuf,
    snapshot: ArchiveSnapshot,
    ignored: IgnoreSet,
    api: Arc<dyn TeachingApi>,
    errors: Arc<ErrorHandler>,
}

impl ExerciseSynchronizer {
    pub fn new(
        exercise_id: i64,
        root: impl Into<PathBuf>,
        snapshot: ArchiveSnapshot,
        ignored: IgnoreSet,
        api: Arc<dyn TeachingApi>,
        errors: Arc<ErrorHandler>,
    ) -> Self {
        Self {
            exercise_id,
            root: root.into(),
            snapshot,
            ignored,
            api,
            errors,
        }
    }

    /// Seeds the snapshot from the archive retained at download time and
    /// computes the ignore set of `root`.
    pub fn arm(
        descriptor: &ExerciseDescriptor,
        root: &Path,
        api: Arc<dyn TeachingApi>,
        errors: Arc<ErrorHandler>,
    ) -> Result<Self, AppError> {
        let exercise_id = descriptor.exercise_id()?;
        let bytes = std::fs::read(&descriptor.zip_location).map_err(|e| {
            warn!("Retained archive {} unreadable: {}", descriptor.zip_location.display(), e);
            AppError::redownload()
        })?;
        let snapshot = ArchiveSnapshot::from_zip_bytes(&bytes)?;
        let ignored = IgnoreSet::from_folder(root);
        info!(
            "Armed exercise {} at {} ({} files, {} ignored)",
            exercise_id,
            root.display(),
            snapshot.len(),
            ignored.len()
        );
        Ok(Self::new(exercise_id, root, snapshot, ignored, api, errors))
    }

    pub fn exercise_id(&self) -> i64 {
        self.exercise_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn snapshot(&self) -> &ArchiveSnapshot {
        &self.snapshot
    }

    /// Archive key for `path`, or `None` when the event must be dropped.
    fn accept(&self, path: &Path, removed: bool) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if relative.file_name().is_some_and(|name| name == DESCRIPTOR_FILE_NAME) {
            return None;
        }
        let ignored = if removed {
            self.ignored.contains_removed(path)
        } else {
            self.ignored.contains(path)
        };
        if ignored {
            return None;
        }
        archive_key(relative)
    }

    async fn store(&mut self, path: &Path) -> SyncOutcome {
        let Some(key) = self.accept(path, false) else {
            return SyncOutcome::Discarded;
        };
        if let Ok(metadata) = tokio::fs::metadata(path).await {
            if metadata.is_dir() {
                return SyncOutcome::Discarded;
            }
        }

        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                self.errors.handle(&AppError::Io(e)).await;
                return SyncOutcome::ReadFailed;
            }
        };

        if self.snapshot.insert(key.clone(), contents) {
            debug!("Snapshot entry {} updated", key);
        }
        self.upload().await
    }

    async fn upload(&self) -> SyncOutcome {
        let archive = match self.snapshot.to_zip_bytes() {
            Ok(archive) => archive,
            Err(e) => {
                self.errors.handle(&e).await;
                return SyncOutcome::UploadFailed;
            }
        };

        self.errors.ui().status("Uploading files...");
        match self.api.upload_archive(self.exercise_id, archive).await {
            Ok(()) => {
                debug!("Uploaded exercise {} ({} files)", self.exercise_id, self.snapshot.len());
                SyncOutcome::Uploaded
            }
            Err(e) => {
                warn!("Upload of exercise {} failed: {}", self.exercise_id, e);
                self.errors.handle(&e).await;
                SyncOutcome::UploadFailed
            }
        }
    }
}

#[async_trait]
impl FileEventHandler for ExerciseSynchronizer {
    async fn on_created(&mut self, path: &Path) -> SyncOutcome {
        self.store(path).await
    }

    async fn on_modified(&mut self, path: &Path) -> SyncOutcome {
        self.store(path).await
    }

    async fn on_deleted(&mut self, path: &Path) -> SyncOutcome {
        let Some(key) = self.accept(path, true) else {
            return SyncOutcome::Discarded;
        };
        if self.snapshot.remove(&key) {
            debug!("Snapshot entry {} removed", key);
        } else {
            let removed = self.snapshot.remove_dir(&key);
            if removed > 0 {
                debug!("Snapshot directory {} removed ({} entries)", key, removed);
            }
        }
        self.upload().await
    }
}
