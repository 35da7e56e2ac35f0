use dialoguer::{Input, Password};
use tracing::{error, info, warn};

/// User-visible messaging of the host. Every message is also logged.
pub trait Ui: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    /// Transient progress text ("Uploading files...").
    fn status(&self, message: &str);
    /// Asks the user for a value. `None` means the prompt was dismissed.
    fn prompt(&self, label: &str, secret: bool) -> Option<String>;
}

/// Ui for the command line: messages go to stderr.
pub struct TerminalUi;

impl Ui for TerminalUi {
    fn info(&self, message: &str) {
        info!("{}", message);
        eprintln!("{}", message);
    }

    fn warn(&self, message: &str) {
        warn!("{}", message);
        eprintln!("warning: {}", message);
    }

    fn error(&self, message: &str) {
        error!("{}", message);
        eprintln!("error: {}", message);
    }

    fn status(&self, message: &str) {
        tracing::debug!("{}", message);
    }

    fn prompt(&self, label: &str, secret: bool) -> Option<String> {
        let answer = if secret {
            Password::new().with_prompt(label).allow_empty_password(true).interact()
        } else {
            Input::<String>::new().with_prompt(label).allow_empty(true).interact_text()
        };
        match answer {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Prompt for {} dismissed: {}", label, e);
                None
            }
        }
    }
}
