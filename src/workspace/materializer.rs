use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::client::TeachingApi;
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::handler::ErrorHandler;
use crate::models::{Exercise, ExerciseDescriptor, User};
use crate::session::SessionStore;
use crate::sync::ArchiveSnapshot;

pub const TEMPLATE_DIR: &str = "template";

/// Turns downloaded exercise archives into folders of the local workspace.
pub struct Materializer {
    config: ClientConfig,
    api: Arc<dyn TeachingApi>,
    session: Arc<SessionStore>,
    errors: Arc<ErrorHandler>,
}

impl Materializer {
    pub fn new(
        config: ClientConfig,
        api: Arc<dyn TeachingApi>,
        session: Arc<SessionStore>,
        errors: Arc<ErrorHandler>,
    ) -> Self {
        Self {
            config,
            api,
            session,
            errors,
        }
    }

    fn user(&self) -> Result<User, AppError> {
        self.session.current_user().ok_or(AppError::NotLoggedIn)
    }

    /// Downloads a student's exercise into `<home>/<user>/<course>/<exercise>`.
    /// An existing folder counts as already downloaded and is returned untouched.
    pub async fn download_exercise(&self, course_name: &str, exercise: &Exercise) -> Result<PathBuf, AppError> {
        let user = self.user()?;
        let target = self.config.exercise_dir(&user.username, course_name, &exercise.name);
        if target.exists() {
            info!("Exercise {} already downloaded at {}", exercise.name, target.display());
            return Ok(target);
        }

        self.errors.ui().status("Downloading exercise files...");
        let archive = self.api.fetch_archive(exercise.id).await?;
        let snapshot = ArchiveSnapshot::from_zip_bytes(&archive)?;

        let retained = self.retain(&user.username, exercise.id, &archive)?;
        snapshot.write_to(&target)?;
        ExerciseDescriptor::student(exercise.id, retained).save(&target)?;
        info!(
            "Downloaded exercise {} ({} files) to {}",
            exercise.name,
            snapshot.len(),
            target.display()
        );

        self.store_file_info(&user.username, &exercise.name, &user.username, exercise.id)
            .await;
        Ok(target)
    }

    /// Downloads every student's submission and the template of an exercise.
    /// Always refreshes from the server. Returns the student folders followed
    /// by the template folder.
    pub async fn download_student_files(&self, course_name: &str, exercise: &Exercise) -> Result<Vec<PathBuf>, AppError> {
        let user = self.user()?;
        let base = self.config.exercise_dir(&user.username, course_name, &exercise.name);

        self.errors.ui().status("Downloading student files...");
        let submissions = self.api.fetch_student_archives(exercise.id).await?;
        let template = self.api.fetch_template(exercise.id).await?;

        let retained = self.retain(&user.username, exercise.id, &submissions)?;
        ArchiveSnapshot::from_zip_bytes(&submissions)?.write_to(&base)?;
        let template_dir = absolute(&base.join(TEMPLATE_DIR))?;
        ArchiveSnapshot::from_zip_bytes(&template)?.write_to(&template_dir)?;

        let mut folders = Vec::new();
        for entry in std::fs::read_dir(&base)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(student) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if student == TEMPLATE_DIR {
                continue;
            }
            let folder = entry.path();
            ExerciseDescriptor::teacher(exercise.id, retained.clone(), template_dir.clone()).save(&folder)?;
            self.store_file_info(&user.username, &exercise.name, &student, exercise.id)
                .await;
            folders.push(folder);
        }
        folders.sort();
        info!(
            "Downloaded {} student submissions of {} to {}",
            folders.len(),
            exercise.name,
            base.display()
        );
        folders.push(template_dir);
        Ok(folders)
    }

    fn retain(&self, username: &str, exercise_id: i64, archive: &[u8]) -> Result<PathBuf, AppError> {
        let path = absolute(&self.config.retained_archive_path(username, exercise_id))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, archive)?;
        Ok(path)
    }

    /// Saves the file-id mapping used to address comments. Failures are
    /// reported but never fail the download.
    async fn store_file_info(&self, viewer: &str, exercise_name: &str, owner: &str, exercise_id: i64) {
        let files = match self.api.fetch_files_info(owner, exercise_id).await {
            Ok(files) => files,
            Err(e) => {
                self.errors.handle(&e).await;
                return;
            }
        };
        let path = self.config.file_info_path(viewer, exercise_name, owner);
        let result = serde_json::to_string(&files)
            .map_err(AppError::from)
            .and_then(|raw| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, raw)?;
                Ok(())
            });
        if let Err(e) = result {
            warn!("Failed to save file info to {}: {}", path.display(), e);
            self.errors.handle(&e).await;
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf, AppError> {
    Ok(std::path::absolute(path)?)
}
