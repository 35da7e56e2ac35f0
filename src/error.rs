use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Error 401. {0}")]
    Unauthorized(String),

    #[error("Error 403. {0}")]
    Forbidden(String),

    #[error("Error {status}. {body}")]
    Status { status: u16, body: String },

    #[error("Can't connect to the server: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{0}")]
    LocalState(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Maps a non-success HTTP status onto the error taxonomy.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 => AppError::Unauthorized(body),
            403 => AppError::Forbidden(body),
            _ => AppError::Status { status, body },
        }
    }

    pub fn redownload() -> Self {
        AppError::LocalState(
            "Error retrieving exercise data, please download the exercise again.".to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_are_classified() {
        assert!(matches!(AppError::from_status(401, String::new()), AppError::Unauthorized(_)));
        assert!(matches!(AppError::from_status(403, String::new()), AppError::Forbidden(_)));
        match AppError::from_status(500, "boom".to_string()) {
            AppError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn status_error_message_includes_body() {
        let err = AppError::from_status(404, "Exercise not found".to_string());
        assert_eq!(err.to_string(), "Error 404. Exercise not found");
    }

    #[test]
    fn auth_errors_keep_server_body() {
        let err = AppError::from_status(403, "Invalid CSRF token".to_string());
        assert_eq!(err.to_string(), "Error 403. Invalid CSRF token");
    }
}
