use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";
pub const DEFAULT_COMMENT_POLL_SECS: u64 = 60;

const INTERNAL_DIR: &str = ".v4t";
const SESSION_FILE: &str = "v4tsession";
const FILE_INFO_DIR: &str = ".fileInfo";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Root of the local workspace; downloads land under `<home>/<username>/...`.
    pub home: PathBuf,
    pub server_url: String,
    pub comment_poll_interval: Duration,
}

impl ClientConfig {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            comment_poll_interval: Duration::from_secs(DEFAULT_COMMENT_POLL_SECS),
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        let home = match env::var("V4T_HOME") {
            Ok(home) => PathBuf::from(home),
            Err(_) => dirs::home_dir()
                .map(|dir| dir.join("v4tdownloads"))
                .ok_or_else(|| AppError::Config("V4T_HOME is not set and no home directory was found".to_string()))?,
        };

        let server_url = env::var("V4T_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());

        let poll_secs = match env::var("V4T_COMMENT_POLL_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|e| AppError::Config(format!("V4T_COMMENT_POLL_SECS is not a number: {}", e)))?,
            Err(_) => DEFAULT_COMMENT_POLL_SECS,
        };

        Ok(Self {
            home,
            server_url,
            comment_poll_interval: Duration::from_secs(poll_secs),
        })
    }

    /// Directory for state that is never part of an exercise folder.
    pub fn internal_dir(&self) -> PathBuf {
        self.home.join(INTERNAL_DIR)
    }

    pub fn session_path(&self) -> PathBuf {
        self.internal_dir().join(SESSION_FILE)
    }

    pub fn user_internal_dir(&self, username: &str) -> PathBuf {
        self.internal_dir().join(username)
    }

    pub fn retained_archive_path(&self, username: &str, exercise_id: i64) -> PathBuf {
        self.user_internal_dir(username).join(format!("{}.zip", exercise_id))
    }

    pub fn file_info_path(&self, username: &str, exercise_name: &str, owner: &str) -> PathBuf {
        self.user_internal_dir(username)
            .join(FILE_INFO_DIR)
            .join(exercise_name)
            .join(format!("{}.json", owner))
    }

    pub fn exercise_dir(&self, username: &str, course_name: &str, exercise_name: &str) -> PathBuf {
        self.home.join(username).join(course_name).join(exercise_name)
    }

    pub fn user_dir(&self, username: &str) -> PathBuf {
        self.home.join(username)
    }
}
