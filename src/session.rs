use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::AppError;
use crate::models::{Exercise, User};

/// Credentials of the current login, persisted as three lines:
/// auth token, anti-forgery token, server base URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub jwt_token: Option<String>,
    pub xsrf_token: String,
    pub base_url: String,
}

impl Session {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut parts = raw.split('\n');
        let (Some(jwt), Some(xsrf), Some(base_url)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(AppError::LocalState("Session file is malformed, please log in again.".to_string()));
        };
        let jwt = jwt.trim();
        Ok(Self {
            jwt_token: (!jwt.is_empty()).then(|| jwt.to_string()),
            xsrf_token: xsrf.trim().to_string(),
            base_url: base_url.trim().to_string(),
        })
    }

    pub fn render(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.jwt_token.as_deref().unwrap_or_default(),
            self.xsrf_token,
            self.base_url
        )
    }
}

/// Accepts absolute http(s) URLs with a host, as typed in the server prompt.
pub fn validate_server_url(value: &str) -> Result<(), AppError> {
    let url = reqwest::Url::parse(value.trim()).map_err(|_| AppError::InvalidUrl(value.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(AppError::InvalidUrl(value.to_string()));
    }
    Ok(())
}

/// Identity provider: the current session plus the user it belongs to.
pub struct SessionStore {
    path: PathBuf,
    session: RwLock<Session>,
    user: RwLock<Option<User>>,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            session: RwLock::new(Session { base_url: base_url.into(), ..Session::default() }),
            user: RwLock::new(None),
        }
    }

    /// Loads the persisted session if there is one; otherwise starts logged out on `base_url`.
    pub fn restore(path: impl Into<PathBuf>, base_url: impl Into<String>) -> Result<Self, AppError> {
        let store = Self::new(path, base_url);
        if store.path.is_file() {
            let raw = std::fs::read_to_string(&store.path)?;
            let session = Session::parse(&raw)?;
            info!("Restored session for {}", session.base_url);
            *store.session.write() = session;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    pub fn base_url(&self) -> String {
        self.session.read().base_url.clone()
    }

    pub fn set_base_url(&self, base_url: impl Into<String>) {
        self.session.write().base_url = base_url.into();
    }

    pub fn set_jwt_token(&self, token: Option<String>) {
        self.session.write().jwt_token = token;
    }

    pub fn set_xsrf_token(&self, token: impl Into<String>) {
        self.session.write().xsrf_token = token.into();
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.read().jwt_token.is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn set_user(&self, user: Option<User>) {
        *self.user.write() = user;
    }

    pub fn cache_exercises(&self, course_id: i64, exercises: Option<Vec<Exercise>>) -> bool {
        match self.user.write().as_mut() {
            Some(user) => user.cache_exercises(course_id, exercises),
            None => false,
        }
    }

    pub fn persist(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, self.session.read().render())?;
        debug!("Session saved to {}", self.path.display());
        Ok(())
    }

    /// Drops the auth token in memory and on disk. The base URL is kept.
    pub fn clear_token(&self) -> Result<(), AppError> {
        {
            let mut session = self.session.write();
            session.jwt_token = None;
            session.xsrf_token.clear();
        }
        if self.path.is_file() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    pub fn logout(&self) -> Result<(), AppError> {
        self.clear_token()?;
        self.set_user(None);
        Ok(())
    }
}
