use serde::{Deserialize, Serialize};

use super::{Course, Exercise};

pub const ROLE_TEACHER: &str = "ROLE_TEACHER";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub role_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub courses: Option<Vec<Course>>,
}

impl User {
    pub fn is_teacher(&self) -> bool {
        self.roles.iter().any(|role| role.role_name == ROLE_TEACHER)
    }

    pub fn find_course(&self, name: &str) -> Option<&Course> {
        self.courses.as_ref()?.iter().find(|course| course.name == name)
    }

    /// Caches the exercises of a course. Returns false when the course is unknown.
    pub fn cache_exercises(&mut self, course_id: i64, exercises: Option<Vec<Exercise>>) -> bool {
        let Some(courses) = self.courses.as_mut() else {
            return false;
        };
        match courses.iter_mut().find(|course| course.id == course_id) {
            Some(course) => {
                course.exercises = exercises;
                true
            }
            None => false,
        }
    }
}
