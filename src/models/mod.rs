pub mod comment;
pub mod course;
pub mod descriptor;
pub mod exercise;
pub mod file_info;
pub mod user;

pub use comment::{Comment, CommentThread, FileComments};
pub use course::{Course, NewCourseRequest};
pub use descriptor::{DESCRIPTOR_FILE_NAME, ExerciseDescriptor};
pub use exercise::{Exercise, ExerciseUserInfo};
pub use file_info::FileInfo;
pub use user::{Role, User};
