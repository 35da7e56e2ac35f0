#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use v4t_client::client::TeachingApi;
use v4t_client::config::ClientConfig;
use v4t_client::error::AppError;
use v4t_client::handler::ErrorHandler;
use v4t_client::models::{Course, Exercise, ExerciseUserInfo, FileComments, FileInfo, Role, User};
use v4t_client::session::SessionStore;
use v4t_client::sync::ArchiveSnapshot;
use v4t_client::ui::Ui;

pub const CSRF_TOKEN: &str = "fresh-xsrf";

/// In-memory server. Every call is recorded by name.
#[derive(Default)]
pub struct FakeApi {
    pub user: Mutex<Option<User>>,
    pub archives: Mutex<HashMap<i64, Vec<u8>>>,
    pub student_archives: Mutex<HashMap<i64, Vec<u8>>>,
    pub templates: Mutex<HashMap<i64, Vec<u8>>>,
    pub exercises: Mutex<HashMap<i64, Vec<Exercise>>>,
    pub files_info: Mutex<HashMap<String, Vec<FileInfo>>>,
    pub comments: Mutex<Vec<FileComments>>,
    pub finished: AtomicBool,
    pub uploads: Mutex<Vec<(i64, Vec<u8>)>>,
    pub posted_comments: Mutex<Vec<(i64, u32, String, String)>>,
    pub upload_failures: Mutex<VecDeque<AppError>>,
    pub comment_failures: Mutex<VecDeque<AppError>>,
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls_to(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|call| **call == name).count()
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().len()
    }

    pub fn last_upload(&self) -> Option<ArchiveSnapshot> {
        self.uploads
            .lock()
            .last()
            .map(|(_, bytes)| ArchiveSnapshot::from_zip_bytes(bytes).unwrap())
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().push(name);
    }
}

fn not_found(what: &str) -> AppError {
    AppError::from_status(404, format!("{} not found", what))
}

#[async_trait]
impl TeachingApi for FakeApi {
    async fn get_csrf_token(&self) -> Result<String, AppError> {
        self.record("get_csrf_token");
        Ok(CSRF_TOKEN.to_string())
    }

    async fn login(&self, username: &str, _password: &str) -> Result<String, AppError> {
        self.record("login");
        Ok(format!("jwt-{}", username))
    }

    async fn get_user_info(&self) -> Result<User, AppError> {
        self.record("get_user_info");
        self.user.lock().clone().ok_or_else(|| AppError::from_status(401, "Unauthorized".to_string()))
    }

    async fn fetch_exercises(&self, course_id: i64) -> Result<Vec<Exercise>, AppError> {
        self.record("fetch_exercises");
        Ok(self.exercises.lock().get(&course_id).cloned().unwrap_or_default())
    }

    async fn fetch_archive(&self, exercise_id: i64) -> Result<Vec<u8>, AppError> {
        self.record("fetch_archive");
        self.archives.lock().get(&exercise_id).cloned().ok_or_else(|| not_found("Exercise"))
    }

    async fn fetch_student_archives(&self, exercise_id: i64) -> Result<Vec<u8>, AppError> {
        self.record("fetch_student_archives");
        self.student_archives
            .lock()
            .get(&exercise_id)
            .cloned()
            .ok_or_else(|| not_found("Exercise"))
    }

    async fn fetch_template(&self, exercise_id: i64) -> Result<Vec<u8>, AppError> {
        self.record("fetch_template");
        self.templates.lock().get(&exercise_id).cloned().ok_or_else(|| not_found("Template"))
    }

    async fn upload_archive(&self, exercise_id: i64, archive: Vec<u8>) -> Result<(), AppError> {
        self.record("upload_archive");
        if let Some(error) = self.upload_failures.lock().pop_front() {
            return Err(error);
        }
        self.uploads.lock().push((exercise_id, archive));
        Ok(())
    }

    async fn fetch_exercise_user_info(&self, exercise_id: i64) -> Result<ExerciseUserInfo, AppError> {
        self.record("fetch_exercise_user_info");
        let user = self.user.lock().clone().ok_or_else(|| AppError::from_status(401, "Unauthorized".to_string()))?;
        Ok(ExerciseUserInfo {
            exercise: Exercise { id: exercise_id, name: "Exercise".to_string() },
            user,
            finished: self.finished.load(Ordering::SeqCst),
        })
    }

    async fn fetch_files_info(&self, username: &str, _exercise_id: i64) -> Result<Vec<FileInfo>, AppError> {
        self.record("fetch_files_info");
        Ok(self.files_info.lock().get(username).cloned().unwrap_or_default())
    }

    async fn fetch_comments(&self, _exercise_id: i64, _username: &str) -> Result<Vec<FileComments>, AppError> {
        self.record("fetch_comments");
        if let Some(error) = self.comment_failures.lock().pop_front() {
            return Err(error);
        }
        Ok(self.comments.lock().clone())
    }

    async fn post_comment(&self, file_id: i64, line: u32, _line_text: &str, author: &str, body: &str) -> Result<(), AppError> {
        self.record("post_comment");
        self.posted_comments
            .lock()
            .push((file_id, line, author.to_string(), body.to_string()));
        Ok(())
    }

    async fn add_course(&self, name: &str) -> Result<Course, AppError> {
        self.record("add_course");
        Ok(Course { id: 99, name: name.to_string(), exercises: None })
    }

    async fn delete_course(&self, _course_id: i64) -> Result<(), AppError> {
        self.record("delete_course");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Status,
}

/// Records messages and answers prompts from a queue; an empty queue dismisses.
#[derive(Default)]
pub struct RecordingUi {
    pub messages: Mutex<Vec<(Level, String)>>,
    pub answers: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<(String, bool)>>,
}

impl RecordingUi {
    pub fn answer(&self, answers: &[&str]) {
        self.answers.lock().extend(answers.iter().map(|answer| answer.to_string()));
    }

    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

impl Ui for RecordingUi {
    fn info(&self, message: &str) {
        self.messages.lock().push((Level::Info, message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.messages.lock().push((Level::Warn, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.messages.lock().push((Level::Error, message.to_string()));
    }

    fn status(&self, message: &str) {
        self.messages.lock().push((Level::Status, message.to_string()));
    }

    fn prompt(&self, label: &str, secret: bool) -> Option<String> {
        self.prompts.lock().push((label.to_string(), secret));
        self.answers.lock().pop_front()
    }
}

pub fn user(username: &str, role: &str, courses: Vec<Course>) -> User {
    User {
        id: 1,
        username: username.to_string(),
        roles: vec![Role { role_name: role.to_string() }],
        courses: Some(courses),
    }
}

pub fn student() -> User {
    user("johndoejr", "ROLE_STUDENT", vec![Course { id: 1, name: "Algorithms".to_string(), exercises: None }])
}

pub fn teacher() -> User {
    user("prof", "ROLE_TEACHER", vec![Course { id: 1, name: "Algorithms".to_string(), exercises: None }])
}

pub fn zip_of(files: &[(&str, &str)]) -> Vec<u8> {
    let mut snapshot = ArchiveSnapshot::new();
    for (path, contents) in files {
        snapshot.insert(*path, contents.as_bytes().to_vec());
    }
    snapshot.to_zip_bytes().unwrap()
}

/// Everything a component under test needs, rooted in a temporary home.
pub struct Harness {
    pub dir: TempDir,
    pub config: ClientConfig,
    pub api: Arc<FakeApi>,
    pub ui: Arc<RecordingUi>,
    pub session: Arc<SessionStore>,
    pub errors: Arc<ErrorHandler>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig::new(dir.path().join("v4tdownloads"));
        let api = FakeApi::new();
        let ui = Arc::new(RecordingUi::default());
        let session = Arc::new(SessionStore::new(config.session_path(), "http://localhost:8080"));
        let errors = Arc::new(ErrorHandler::new(api.clone(), session.clone(), ui.clone()));
        Self { dir, config, api, ui, session, errors }
    }

    /// Logs `user` in without going through the login command.
    pub fn logged_in(user: User) -> Self {
        let harness = Self::new();
        harness.session.set_jwt_token(Some("jwt".to_string()));
        *harness.api.user.lock() = Some(user.clone());
        harness.session.set_user(Some(user));
        harness
    }

    pub fn workspace(&self) -> PathBuf {
        let path = self.dir.path().join("workspace");
        std::fs::create_dir_all(&path).unwrap();
        path.canonicalize().unwrap()
    }
}
