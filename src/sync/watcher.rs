use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::sync::synchronizer::{FileEvent, FileEventHandler, FileEventKind};

/// Recursive watch over one folder. Events are delivered, in the order the
/// platform reports them, to a single task that owns the handler.
pub struct FolderWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl FolderWatcher {
    pub fn spawn<H>(root: &Path, mut handler: H) -> Result<Self, AppError>
    where
        H: FileEventHandler + 'static,
    {
        let root = root.canonicalize()?;
        let (tx, mut rx) = mpsc::unbounded_channel::<FileEvent>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for file_event in translate(event) {
                    // The receiver only goes away when the watcher is being torn down.
                    let _ = tx.send(file_event);
                }
            }
            Err(e) => warn!("watch error: {}", e),
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!("Watching for changes in {}", root.display());

        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let outcome = handler.on_file_event(event.clone()).await;
                debug!("{:?} {} -> {:?}", event.kind, event.path.display(), outcome);
            }
        });

        Ok(Self {
            root,
            _watcher: watcher,
            task,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stop(self) {
        info!("Stopped watching {}", self.root.display());
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Maps a platform event onto the created/modified/deleted vocabulary.
pub fn translate(event: Event) -> Vec<FileEvent> {
    let Event { kind, paths, .. } = event;
    let all = |kind: FileEventKind| -> Vec<FileEvent> {
        paths.iter().map(|path| FileEvent::new(path.clone(), kind)).collect()
    };

    match kind {
        EventKind::Create(_) => all(FileEventKind::Created),
        EventKind::Remove(_) => all(FileEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => all(FileEventKind::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => all(FileEventKind::Created),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() == 2 => vec![
            FileEvent::new(paths[0].clone(), FileEventKind::Deleted),
            FileEvent::new(paths[1].clone(), FileEventKind::Created),
        ],
        // Backends that cannot tell the rename side apart.
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .map(|path| {
                let kind = if path.exists() { FileEventKind::Created } else { FileEventKind::Deleted };
                FileEvent::new(path.clone(), kind)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => all(FileEventKind::Modified),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn maps_create_modify_remove() {
        let created = translate(event(EventKind::Create(CreateKind::File), &["/w/a.txt"]));
        assert_eq!(created, vec![FileEvent::new("/w/a.txt", FileEventKind::Created)]);

        let modified = translate(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/w/a.txt"],
        ));
        assert_eq!(modified, vec![FileEvent::new("/w/a.txt", FileEventKind::Modified)]);

        let removed = translate(event(EventKind::Remove(RemoveKind::File), &["/w/a.txt"]));
        assert_eq!(removed, vec![FileEvent::new("/w/a.txt", FileEventKind::Deleted)]);
    }

    #[test]
    fn rename_becomes_delete_then_create() {
        let renamed = translate(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/w/old.txt", "/w/new.txt"],
        ));
        assert_eq!(
            renamed,
            vec![
                FileEvent::new("/w/old.txt", FileEventKind::Deleted),
                FileEvent::new("/w/new.txt", FileEventKind::Created),
            ]
        );
    }

    #[test]
    fn metadata_and_access_events_are_dropped() {
        assert!(translate(event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/w/a.txt"],
        ))
        .is_empty());
        assert!(translate(event(EventKind::Any, &["/w/a.txt"])).is_empty());
    }
}
