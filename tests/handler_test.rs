mod common;

use common::{CSRF_TOKEN, Harness, Level};
use v4t_client::error::AppError;
use v4t_client::handler::ErrorAction;

fn unauthorized() -> AppError {
    AppError::from_status(401, "Full authentication is required".to_string())
}

fn forbidden() -> AppError {
    AppError::from_status(403, "Invalid CSRF token".to_string())
}

#[tokio::test]
async fn test_first_unauthorized_drops_credentials() {
    let harness = Harness::logged_in(common::student());
    harness.session.persist().unwrap();

    let action = harness.errors.handle(&unauthorized()).await;

    assert_eq!(action, ErrorAction::ReLogin);
    assert!(!harness.session.is_logged_in());
    assert!(!harness.config.session_path().exists());
    assert_eq!(
        harness.ui.at(Level::Warn),
        vec!["It seems that we couldn't log in, please log in.".to_string()]
    );
}

#[tokio::test]
async fn test_repeated_unauthorized_is_only_reported() {
    let harness = Harness::logged_in(common::student());

    harness.errors.handle(&unauthorized()).await;
    let action = harness.errors.handle(&unauthorized()).await;

    assert_eq!(action, ErrorAction::Reported);
    assert_eq!(harness.ui.at(Level::Error), vec!["Error 401. Full authentication is required".to_string()]);

    // The flag was reset, so the next 401 recovers again.
    assert_eq!(harness.errors.handle(&unauthorized()).await, ErrorAction::ReLogin);
}

#[tokio::test]
async fn test_first_forbidden_refreshes_xsrf_token() {
    let harness = Harness::logged_in(common::student());
    harness.session.set_xsrf_token("stale");

    let action = harness.errors.handle(&forbidden()).await;

    assert_eq!(action, ErrorAction::RetryWithFreshToken);
    assert_eq!(harness.session.session().xsrf_token, CSRF_TOKEN);
    assert!(harness.session.is_logged_in());
    assert_eq!(harness.ui.at(Level::Warn), vec!["Something went wrong, please try again.".to_string()]);

    assert_eq!(harness.errors.handle(&forbidden()).await, ErrorAction::Reported);
    assert_eq!(harness.ui.at(Level::Error), vec!["Error 403. Invalid CSRF token".to_string()]);
    assert_eq!(harness.api.calls_to("get_csrf_token"), 1);
}

#[tokio::test]
async fn test_other_status_shows_code_and_body() {
    let harness = Harness::new();

    let action = harness
        .errors
        .handle(&AppError::from_status(500, "Internal error".to_string()))
        .await;

    assert_eq!(action, ErrorAction::Reported);
    assert_eq!(harness.ui.at(Level::Error), vec!["Error 500. Internal error".to_string()]);
}

#[tokio::test]
async fn test_connection_failure_message() {
    let harness = Harness::new();
    harness
        .errors
        .handle(&AppError::Connect("tcp connect error".to_string()))
        .await;
    assert_eq!(harness.ui.at(Level::Error), vec!["Can't connect to the server".to_string()]);
}
