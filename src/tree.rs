use std::sync::Arc;

use tracing::debug;

use crate::client::TeachingApi;
use crate::commands::{CommandArgs, CommandId, CommandInvocation};
use crate::error::AppError;
use crate::handler::ErrorHandler;
use crate::models::{Exercise, User};
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Login,
    Course,
    Exercise,
    AddCourse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub label: String,
    pub kind: ItemKind,
    pub collapsible: bool,
    pub command: Option<CommandInvocation>,
}

impl TreeItem {
    fn login() -> Self {
        Self {
            label: "Login".to_string(),
            kind: ItemKind::Login,
            collapsible: false,
            command: Some(CommandInvocation::bare(CommandId::Login)),
        }
    }

    fn add_course() -> Self {
        Self {
            label: "Add Course".to_string(),
            kind: ItemKind::AddCourse,
            collapsible: false,
            command: Some(CommandInvocation::bare(CommandId::AddCourse)),
        }
    }

    fn course(name: &str) -> Self {
        Self {
            label: name.to_string(),
            kind: ItemKind::Course,
            collapsible: true,
            command: None,
        }
    }
}

/// Data provider of the course tree. Courses come with the user record;
/// exercises are fetched the first time a course is expanded and cached.
pub struct CoursesTree {
    api: Arc<dyn TeachingApi>,
    session: Arc<SessionStore>,
    errors: Arc<ErrorHandler>,
}

impl CoursesTree {
    pub fn new(api: Arc<dyn TeachingApi>, session: Arc<SessionStore>, errors: Arc<ErrorHandler>) -> Self {
        Self { api, session, errors }
    }

    pub async fn root_items(&self) -> Vec<TreeItem> {
        if !self.session.is_logged_in() {
            return vec![TreeItem::login()];
        }

        let user = match self.session.current_user() {
            Some(user) if user.courses.is_some() => user,
            _ => match self.load_user().await {
                Ok(user) => user,
                Err(e) => {
                    self.errors.handle(&e).await;
                    return vec![TreeItem::login()];
                }
            },
        };

        let mut items: Vec<TreeItem> = user
            .courses
            .iter()
            .flatten()
            .map(|course| TreeItem::course(&course.name))
            .collect();
        if user.is_teacher() {
            items.push(TreeItem::add_course());
        }
        items
    }

    pub async fn children(&self, course_name: &str) -> Vec<TreeItem> {
        let Some(user) = self.session.current_user() else {
            return Vec::new();
        };
        let exercises = match self.exercises(course_name).await {
            Ok(exercises) => exercises,
            Err(e) => {
                self.errors.handle(&e).await;
                return Vec::new();
            }
        };

        let command = if user.is_teacher() {
            CommandId::GetStudentFiles
        } else {
            CommandId::GetExerciseFiles
        };
        exercises
            .into_iter()
            .map(|exercise| TreeItem {
                label: exercise.name.clone(),
                kind: ItemKind::Exercise,
                collapsible: false,
                command: Some(CommandInvocation::new(
                    command,
                    CommandArgs::Exercise {
                        course_name: course_name.to_string(),
                        exercise,
                    },
                )),
            })
            .collect()
    }

    /// Exercises of a course, from cache when already fetched.
    pub async fn exercises(&self, course_name: &str) -> Result<Vec<Exercise>, AppError> {
        let user = match self.session.current_user() {
            Some(user) => user,
            None => self.load_user().await?,
        };
        let course = user
            .find_course(course_name)
            .ok_or_else(|| AppError::LocalState(format!("Unknown course: {}", course_name)))?;
        if let Some(exercises) = &course.exercises {
            return Ok(exercises.clone());
        }

        self.errors.ui().status("Getting exercises...");
        let exercises = self.api.fetch_exercises(course.id).await?;
        self.session.cache_exercises(course.id, Some(exercises.clone()));
        debug!("Cached {} exercises of {}", exercises.len(), course_name);
        Ok(exercises)
    }

    pub async fn load_user(&self) -> Result<User, AppError> {
        if !self.session.is_logged_in() {
            return Err(AppError::NotLoggedIn);
        }
        self.errors.ui().status("Getting user courses...");
        let user = self.api.get_user_info().await?;
        self.session.set_user(Some(user.clone()));
        Ok(user)
    }

    pub fn refresh_courses(&self) {
        self.session.set_user(None);
    }

    pub fn refresh_exercises(&self, course_name: &str) -> bool {
        let Some(course_id) = self
            .session
            .current_user()
            .and_then(|user| user.find_course(course_name).map(|course| course.id))
        else {
            return false;
        };
        self.session.cache_exercises(course_id, None)
    }
}
