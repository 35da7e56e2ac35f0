use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::client::TeachingApi;
use crate::error::AppError;
use crate::session::SessionStore;
use crate::ui::Ui;

/// What the handler did with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Credentials were dropped; the user has to log in again.
    ReLogin,
    /// The anti-forgery token was refreshed once.
    RetryWithFreshToken,
    /// Only a message was shown.
    Reported,
}

/// Single funnel for every failure of the client. Picks the user-visible
/// message and the one-shot recovery for 401/403 responses.
pub struct ErrorHandler {
    api: Arc<dyn TeachingApi>,
    session: Arc<SessionStore>,
    ui: Arc<dyn Ui>,
    unauthorized_seen: AtomicBool,
    forbidden_seen: AtomicBool,
}

impl ErrorHandler {
    pub fn new(api: Arc<dyn TeachingApi>, session: Arc<SessionStore>, ui: Arc<dyn Ui>) -> Self {
        Self {
            api,
            session,
            ui,
            unauthorized_seen: AtomicBool::new(false),
            forbidden_seen: AtomicBool::new(false),
        }
    }

    pub fn ui(&self) -> &dyn Ui {
        self.ui.as_ref()
    }

    pub async fn handle(&self, error: &AppError) -> ErrorAction {
        match error {
            AppError::Unauthorized(_) if !self.unauthorized_seen.swap(true, Ordering::SeqCst) => {
                self.ui.warn("It seems that we couldn't log in, please log in.");
                if let Err(e) = self.session.clear_token() {
                    warn!("Failed to clear stored session: {}", e);
                }
                ErrorAction::ReLogin
            }
            AppError::Forbidden(_) if !self.forbidden_seen.swap(true, Ordering::SeqCst) => {
                self.ui.warn("Something went wrong, please try again.");
                match self.api.get_csrf_token().await {
                    Ok(token) => self.session.set_xsrf_token(token),
                    Err(e) => warn!("Failed to refresh anti-forgery token: {}", e),
                }
                ErrorAction::RetryWithFreshToken
            }
            AppError::Unauthorized(_) | AppError::Forbidden(_) | AppError::Status { .. } => {
                self.reset();
                self.ui.error(&error.to_string());
                ErrorAction::Reported
            }
            AppError::Connect(detail) => {
                warn!("Connection failure: {}", detail);
                self.ui.error("Can't connect to the server");
                ErrorAction::Reported
            }
            _ => {
                self.ui.error(&error.to_string());
                ErrorAction::Reported
            }
        }
    }

    fn reset(&self) {
        self.unauthorized_seen.store(false, Ordering::SeqCst);
        self.forbidden_seen.store(false, Ordering::SeqCst);
    }
}
