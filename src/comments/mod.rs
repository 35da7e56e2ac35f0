pub mod poller;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use parking_lot::RwLock;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::AppError;
use crate::models::{FileComments, FileInfo, User};

pub use poller::CommentPoller;

/// Annotation display for comment threads of a folder.
pub trait CommentSink: Send + Sync {
    fn show_threads(&self, folder: &Path, files: Vec<FileComments>);
}

/// Keeps the latest threads per folder in memory.
#[derive(Default)]
pub struct CommentStore {
    threads: RwLock<HashMap<PathBuf, Vec<FileComments>>>,
}

impl CommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads_for(&self, folder: &Path) -> Vec<FileComments> {
        self.threads.read().get(folder).cloned().unwrap_or_default()
    }

    pub fn forget(&self, folder: &Path) {
        self.threads.write().remove(folder);
    }
}

impl CommentSink for CommentStore {
    fn show_threads(&self, folder: &Path, files: Vec<FileComments>) {
        let count: usize = files.iter().map(|file| file.threads.len()).sum();
        info!("{} comment threads on {}", count, folder.display());
        self.threads.write().insert(folder.to_path_buf(), files);
    }
}

fn missing_file_id() -> AppError {
    AppError::LocalState("Error retrieving file id, please download the exercise again.".to_string())
}

/// Finds the server id of a local file through the saved file-id mapping.
///
/// Students address their own files at `<home>/<user>/<course>/<exercise>/<path>`;
/// teachers address a student's copy at `<home>/<user>/<course>/<exercise>/<student>/<path>`.
pub fn resolve_file_id(config: &ClientConfig, user: &User, file: &Path) -> Result<i64, AppError> {
    let relative = file
        .strip_prefix(config.user_dir(&user.username))
        .map_err(|_| missing_file_id())?;
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    let (exercise, owner, rest) = match parts.as_slice() {
        [_course, exercise, owner, rest @ ..] if user.is_teacher() && !rest.is_empty() => {
            (*exercise, *owner, rest)
        }
        [_course, exercise, rest @ ..] if !user.is_teacher() && !rest.is_empty() => {
            (*exercise, user.username.as_str(), rest)
        }
        _ => return Err(missing_file_id()),
    };

    let info_path = config.file_info_path(&user.username, exercise, owner);
    let raw = std::fs::read_to_string(&info_path).map_err(|_| missing_file_id())?;
    let files: Vec<FileInfo> = serde_json::from_str(&raw).map_err(|_| missing_file_id())?;

    let wanted = rest.join("/");
    files
        .iter()
        .find(|info| info.path.replace('\\', "/") == wanted)
        .map(|info| info.id)
        .ok_or_else(missing_file_id)
}
