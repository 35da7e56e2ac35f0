use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Sidecar file linking a local folder to its server exercise.
pub const DESCRIPTOR_FILE_NAME: &str = "v4texercise.v4t";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exercise_id: Option<i64>,
    pub zip_location: PathBuf,
    #[serde(default)]
    pub teacher: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
}

impl ExerciseDescriptor {
    pub fn student(exercise_id: i64, zip_location: PathBuf) -> Self {
        Self {
            exercise_id: Some(exercise_id),
            zip_location,
            teacher: false,
            template: None,
        }
    }

    pub fn teacher(exercise_id: i64, zip_location: PathBuf, template: PathBuf) -> Self {
        Self {
            exercise_id: Some(exercise_id),
            zip_location,
            teacher: true,
            template: Some(template),
        }
    }

    /// Descriptors written before the id was recorded only carry it in the
    /// archive file name (`<id>.zip`).
    pub fn exercise_id(&self) -> Result<i64, AppError> {
        if let Some(id) = self.exercise_id {
            return Ok(id);
        }
        self.zip_location
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.split('.').next())
            .and_then(|id| id.parse::<i64>().ok())
            .ok_or_else(AppError::redownload)
    }

    pub fn path_in(folder: &Path) -> PathBuf {
        folder.join(DESCRIPTOR_FILE_NAME)
    }

    /// Reads the descriptor of `folder`; `Ok(None)` when the folder is not an exercise.
    pub fn load(folder: &Path) -> Result<Option<Self>, AppError> {
        let path = Self::path_in(folder);
        if !path.is_file() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        let descriptor = serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!("Unreadable descriptor {}: {}", path.display(), e);
            AppError::redownload()
        })?;
        Ok(Some(descriptor))
    }

    pub fn save(&self, folder: &Path) -> Result<(), AppError> {
        let raw = serde_json::to_string(self)?;
        std::fs::write(Self::path_in(folder), raw)?;
        Ok(())
    }
}
