use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::client::TeachingApi;
use crate::comments::CommentSink;
use crate::handler::ErrorHandler;

/// Periodically re-fetches the comment threads of one exercise/user pair.
pub struct CommentPoller {
    api: Arc<dyn TeachingApi>,
    errors: Arc<ErrorHandler>,
    sink: Arc<dyn CommentSink>,
    exercise_id: i64,
    username: String,
    folder: PathBuf,
    interval: Duration,
}

impl CommentPoller {
    pub fn new(
        api: Arc<dyn TeachingApi>,
        errors: Arc<ErrorHandler>,
        sink: Arc<dyn CommentSink>,
        exercise_id: i64,
        username: impl Into<String>,
        folder: impl Into<PathBuf>,
        interval: Duration,
    ) -> Self {
        Self {
            api,
            errors,
            sink,
            exercise_id,
            username: username.into(),
            folder: folder.into(),
            interval,
        }
    }

    /// Polls forever: once right away, then every `interval`. Failed fetches
    /// are reported and the next tick happens regardless.
    pub async fn start(self) {
        info!(
            "Starting comment polling for exercise {} of {} (interval: {:?})",
            self.exercise_id, self.username, self.interval
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// Returns true when fresh threads were delivered to the sink.
    pub async fn poll_once(&self) -> bool {
        match self.api.fetch_comments(self.exercise_id, &self.username).await {
            Ok(files) => {
                debug!(
                    "Fetched comments on {} files for exercise {} of {}",
                    files.len(),
                    self.exercise_id,
                    self.username
                );
                self.sink.show_threads(&self.folder, files);
                true
            }
            Err(e) => {
                tracing::warn!("Comment refresh failed: {:?}", e);
                self.errors.handle(&e).await;
                false
            }
        }
    }
}
