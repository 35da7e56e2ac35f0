use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::Exercise;

pub const COMMAND_PREFIX: &str = "vscode4teaching.";

/// The fixed set of commands the client answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Login,
    Logout,
    GetExerciseFiles,
    GetStudentFiles,
    AddCourse,
    DeleteCourse,
    RefreshCourses,
    RefreshExercises,
    Diff,
    CreateComment,
}

impl CommandId {
    pub const ALL: [CommandId; 10] = [
        CommandId::Login,
        CommandId::Logout,
        CommandId::GetExerciseFiles,
        CommandId::GetStudentFiles,
        CommandId::AddCourse,
        CommandId::DeleteCourse,
        CommandId::RefreshCourses,
        CommandId::RefreshExercises,
        CommandId::Diff,
        CommandId::CreateComment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::Login => "vscode4teaching.login",
            CommandId::Logout => "vscode4teaching.logout",
            CommandId::GetExerciseFiles => "vscode4teaching.getexercisefiles",
            CommandId::GetStudentFiles => "vscode4teaching.getstudentfiles",
            CommandId::AddCourse => "vscode4teaching.addcourse",
            CommandId::DeleteCourse => "vscode4teaching.deletecourse",
            CommandId::RefreshCourses => "vscode4teaching.refreshcourses",
            CommandId::RefreshExercises => "vscode4teaching.refreshexercises",
            CommandId::Diff => "vscode4teaching.diff",
            CommandId::CreateComment => "vscode4teaching.createComment",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            CommandId::Login => "Log in to VS Code 4 Teaching",
            CommandId::Logout => "Log out",
            CommandId::GetExerciseFiles => "Get exercise files",
            CommandId::GetStudentFiles => "Get student files",
            CommandId::AddCourse => "Add course",
            CommandId::DeleteCourse => "Delete course",
            CommandId::RefreshCourses => "Refresh courses",
            CommandId::RefreshExercises => "Refresh exercises",
            CommandId::Diff => "Diff with template",
            CommandId::CreateComment => "Create comment",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| AppError::UnknownCommand(s.to_string()))
    }
}

/// Arguments carried by a command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArgs {
    None,
    Credentials {
        server: String,
        username: String,
        password: String,
    },
    Exercise {
        course_name: String,
        exercise: Exercise,
    },
    CourseName(String),
    Course {
        course_id: i64,
    },
    File(PathBuf),
    Comment {
        file: PathBuf,
        line: u32,
        line_text: String,
        body: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub id: CommandId,
    pub args: CommandArgs,
}

impl CommandInvocation {
    pub fn new(id: CommandId, args: CommandArgs) -> Self {
        Self { id, args }
    }

    pub fn bare(id: CommandId) -> Self {
        Self::new(id, CommandArgs::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_round_trip() {
        for id in CommandId::ALL {
            assert!(id.as_str().starts_with(COMMAND_PREFIX));
            assert_eq!(id.as_str().parse::<CommandId>().unwrap(), id);
        }
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        assert!(matches!(
            "vscode4teaching.launchrockets".parse::<CommandId>(),
            Err(AppError::UnknownCommand(_))
        ));
    }
}
