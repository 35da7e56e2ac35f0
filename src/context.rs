use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::client::TeachingApi;
use crate::commands::{CommandArgs, CommandId, CommandInvocation};
use crate::comments::{self, CommentPoller, CommentSink};
use crate::config::ClientConfig;
use crate::error::AppError;
use crate::handler::ErrorHandler;
use crate::models::{Course, ExerciseDescriptor, User};
use crate::session::{SessionStore, validate_server_url};
use crate::sync::{ExerciseSynchronizer, FolderWatcher};
use crate::tree::{CoursesTree, TreeItem};
use crate::ui::Ui;
use crate::workspace::{Materializer, TEMPLATE_DIR};

/// What arming a folder resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmState {
    /// No descriptor in the folder.
    NotAnExercise,
    /// A teacher's copy of a student folder: comments only, never uploaded.
    TeacherView,
    /// The student finished the exercise; edits are no longer uploaded.
    Finished,
    Watching,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    OpenFolders(Vec<PathBuf>),
    Items(Vec<TreeItem>),
    CourseAdded(Course),
    Diff { file: PathBuf, template: PathBuf },
    /// The user dismissed a prompt; nothing was done.
    Cancelled,
}

#[derive(Default)]
struct ArmedFolder {
    watcher: Option<FolderWatcher>,
    poller: Option<JoinHandle<()>>,
}

impl ArmedFolder {
    fn stop(mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.stop();
        }
    }
}

impl Drop for ArmedFolder {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

/// Everything the client needs while it is active. Built on activation and
/// torn down with [`ExtensionContext::deactivate`].
pub struct ExtensionContext {
    config: ClientConfig,
    session: Arc<SessionStore>,
    api: Arc<dyn TeachingApi>,
    errors: Arc<ErrorHandler>,
    comments: Arc<dyn CommentSink>,
    tree: CoursesTree,
    materializer: Materializer,
    /// Template folder per armed teacher folder, for diffs.
    templates: HashMap<PathBuf, PathBuf>,
    folders: HashMap<PathBuf, ArmedFolder>,
}

impl ExtensionContext {
    pub fn new(
        config: ClientConfig,
        session: Arc<SessionStore>,
        api: Arc<dyn TeachingApi>,
        ui: Arc<dyn Ui>,
        comments: Arc<dyn CommentSink>,
    ) -> Self {
        let errors = Arc::new(ErrorHandler::new(api.clone(), session.clone(), ui));
        let tree = CoursesTree::new(api.clone(), session.clone(), errors.clone());
        let materializer = Materializer::new(config.clone(), api.clone(), session.clone(), errors.clone());
        Self {
            config,
            session,
            api,
            errors,
            comments,
            tree,
            materializer,
            templates: HashMap::new(),
            folders: HashMap::new(),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn errors(&self) -> &Arc<ErrorHandler> {
        &self.errors
    }

    pub fn tree(&self) -> &CoursesTree {
        &self.tree
    }

    pub fn materializer(&self) -> &Materializer {
        &self.materializer
    }

    pub fn is_armed(&self, folder: &Path) -> bool {
        folder
            .canonicalize()
            .map(|root| self.folders.contains_key(&root))
            .unwrap_or(false)
    }

    /// Restores the user of a persisted session and arms every open folder
    /// that holds an exercise descriptor.
    pub async fn activate(&mut self, folders: &[PathBuf]) -> Vec<(PathBuf, ArmState)> {
        if self.session.is_logged_in() {
            if let Err(e) = self.tree.load_user().await {
                self.errors.handle(&e).await;
            }
        }

        let mut states = Vec::with_capacity(folders.len());
        for folder in folders {
            match self.arm_folder(folder).await {
                Ok(state) => states.push((folder.clone(), state)),
                Err(e) => {
                    warn!("Could not arm {}: {}", folder.display(), e);
                    self.errors.handle(&e).await;
                }
            }
        }
        states
    }

    pub fn deactivate(&mut self) {
        for (_, folder) in self.folders.drain() {
            folder.stop();
        }
        self.templates.clear();
        info!("Deactivated");
    }

    pub async fn login(&mut self, server: &str, username: &str, password: &str) -> Result<User, AppError> {
        validate_server_url(server)?;
        self.session.logout()?;
        self.session.set_base_url(server.trim());

        let xsrf = self.api.get_csrf_token().await?;
        self.session.set_xsrf_token(xsrf);

        self.errors.ui().status("Logging in to VS Code 4 Teaching...");
        let jwt = self.api.login(username, password).await?;
        self.session.set_jwt_token(Some(jwt));
        self.session.persist()?;
        self.errors.ui().info("Logged in");

        self.tree.load_user().await
    }

    pub fn logout(&mut self) -> Result<(), AppError> {
        self.deactivate();
        self.session.logout()?;
        self.errors.ui().info("Logged out");
        Ok(())
    }

    /// Reads the folder's descriptor and starts its comment polling and, for
    /// students, its synchronizer. Re-arming a folder replaces the old watcher.
    pub async fn arm_folder(&mut self, folder: &Path) -> Result<ArmState, AppError> {
        let Some(descriptor) = ExerciseDescriptor::load(folder)? else {
            return Ok(ArmState::NotAnExercise);
        };
        let exercise_id = descriptor.exercise_id()?;
        let root = folder.canonicalize()?;
        self.disarm_folder(&root);

        let user = self.session.current_user();
        let mut armed = ArmedFolder::default();
        let state = if descriptor.teacher {
            if let Some(template) = &descriptor.template {
                self.templates.insert(root.clone(), template.clone());
            }
            ArmState::TeacherView
        } else if user.is_some() && self.is_finished(exercise_id).await {
            self.errors
                .ui()
                .info("This exercise is finished, changes are no longer uploaded.");
            ArmState::Finished
        } else {
            let synchronizer = ExerciseSynchronizer::arm(&descriptor, &root, self.api.clone(), self.errors.clone())?;
            armed.watcher = Some(FolderWatcher::spawn(&root, synchronizer)?);
            ArmState::Watching
        };

        // Polling only starts once nothing else can fail.
        if let Some(user) = &user {
            let folder_name = root.file_name().and_then(|name| name.to_str()).unwrap_or_default();
            if folder_name != TEMPLATE_DIR {
                let username = if user.is_teacher() {
                    folder_name.to_string()
                } else {
                    user.username.clone()
                };
                let poller = CommentPoller::new(
                    self.api.clone(),
                    self.errors.clone(),
                    self.comments.clone(),
                    exercise_id,
                    username,
                    root.clone(),
                    self.config.comment_poll_interval,
                );
                armed.poller = Some(tokio::spawn(poller.start()));
            }
        }

        self.folders.insert(root, armed);
        Ok(state)
    }

    async fn is_finished(&self, exercise_id: i64) -> bool {
        match self.api.fetch_exercise_user_info(exercise_id).await {
            Ok(info) => info.finished,
            Err(e) => {
                self.errors.handle(&e).await;
                false
            }
        }
    }

    pub fn disarm_folder(&mut self, folder: &Path) -> bool {
        let root = folder.canonicalize().unwrap_or_else(|_| folder.to_path_buf());
        self.templates.remove(&root);
        match self.folders.remove(&root) {
            Some(armed) => {
                armed.stop();
                true
            }
            None => false,
        }
    }

    /// Runs a command, sending any failure through the error handler.
    pub async fn run(&mut self, invocation: CommandInvocation) -> Option<CommandOutcome> {
        match self.execute(invocation).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.errors.handle(&e).await;
                None
            }
        }
    }

    pub async fn execute(&mut self, invocation: CommandInvocation) -> Result<CommandOutcome, AppError> {
        match (invocation.id, invocation.args) {
            (CommandId::Login, CommandArgs::Credentials { server, username, password }) => {
                self.login(&server, &username, &password).await?;
                Ok(CommandOutcome::Done)
            }
            (CommandId::Login, CommandArgs::None) => {
                let Some((server, username, password)) = self.ask_credentials() else {
                    return Ok(CommandOutcome::Cancelled);
                };
                self.login(&server, &username, &password).await?;
                Ok(CommandOutcome::Done)
            }
            (CommandId::Logout, _) => {
                self.logout()?;
                Ok(CommandOutcome::Done)
            }
            (CommandId::GetExerciseFiles, CommandArgs::Exercise { course_name, exercise }) => {
                let folder = self.materializer.download_exercise(&course_name, &exercise).await?;
                self.arm_folder(&folder).await?;
                Ok(CommandOutcome::OpenFolders(vec![folder]))
            }
            (CommandId::GetStudentFiles, CommandArgs::Exercise { course_name, exercise }) => {
                let folders = self
                    .materializer
                    .download_student_files(&course_name, &exercise)
                    .await?;
                for folder in &folders {
                    if let Err(e) = self.arm_folder(folder).await {
                        self.errors.handle(&e).await;
                    }
                }
                Ok(CommandOutcome::OpenFolders(folders))
            }
            (CommandId::AddCourse, CommandArgs::CourseName(name)) => self.add_course(&name).await,
            (CommandId::AddCourse, CommandArgs::None) => match self.ask("Course name", false) {
                Some(name) => self.add_course(&name).await,
                None => Ok(CommandOutcome::Cancelled),
            },
            (CommandId::DeleteCourse, CommandArgs::Course { course_id }) => {
                self.api.delete_course(course_id).await?;
                self.tree.refresh_courses();
                Ok(CommandOutcome::Done)
            }
            (CommandId::RefreshCourses, _) => {
                self.tree.refresh_courses();
                Ok(CommandOutcome::Items(self.tree.root_items().await))
            }
            (CommandId::RefreshExercises, CommandArgs::CourseName(name)) => {
                self.tree.refresh_exercises(&name);
                Ok(CommandOutcome::Items(self.tree.children(&name).await))
            }
            (CommandId::Diff, CommandArgs::File(file)) => self.diff(&file),
            (CommandId::CreateComment, CommandArgs::Comment { file, line, line_text, body }) => {
                let user = self.session.current_user().ok_or(AppError::NotLoggedIn)?;
                let file_id = comments::resolve_file_id(&self.config, &user, &file)?;
                self.api
                    .post_comment(file_id, line, &line_text, &user.username, &body)
                    .await?;
                Ok(CommandOutcome::Done)
            }
            (id, _) => Err(AppError::InvalidArguments(format!("{} was invoked with the wrong arguments", id))),
        }
    }

    async fn add_course(&mut self, name: &str) -> Result<CommandOutcome, AppError> {
        let course = self.api.add_course(name).await?;
        self.tree.refresh_courses();
        Ok(CommandOutcome::CourseAdded(course))
    }

    /// Trimmed, non-empty answer to a prompt.
    fn ask(&self, label: &str, secret: bool) -> Option<String> {
        self.errors
            .ui()
            .prompt(label, secret)
            .map(|answer| answer.trim().to_string())
            .filter(|answer| !answer.is_empty())
    }

    /// Server, username and password, as typed by the user. An empty server
    /// answer keeps the current base URL.
    fn ask_credentials(&self) -> Option<(String, String, String)> {
        let current = self.session.base_url();
        let server = self
            .errors
            .ui()
            .prompt(&format!("Server URL [{}]", current), false)?;
        let server = match server.trim() {
            "" => current,
            typed => typed.to_string(),
        };
        let username = self.ask("Username", false)?;
        let password = self.errors.ui().prompt("Password", true)?;
        Some((server, username, password))
    }

    fn diff(&self, file: &Path) -> Result<CommandOutcome, AppError> {
        let not_in_template = || AppError::LocalState("File doesn't exist in the template.".to_string());
        let file = file.canonicalize().map_err(|_| not_in_template())?;
        let (folder, template) = self
            .templates
            .iter()
            .find(|(folder, _)| file.starts_with(folder))
            .ok_or_else(not_in_template)?;
        let relative = file.strip_prefix(folder).map_err(|_| not_in_template())?;
        let template_file = template.join(relative);
        if !template_file.is_file() {
            return Err(not_in_template());
        }
        Ok(CommandOutcome::Diff {
            file: file.clone(),
            template: template_file,
        })
    }
}

impl Drop for ExtensionContext {
    fn drop(&mut self) {
        for (_, folder) in self.folders.drain() {
            folder.stop();
        }
    }
}
