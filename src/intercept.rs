// src/intercept.rs

//! Mode-dependent handling of asset errors.
//!
//! Every transform task reports its failures through an [`ErrorInterceptor`]
//! carrying the task's label:
//!
//! - production: `[label] message` on stderr, then the task stops and the
//!   pipeline exits non-zero;
//! - development: a desktop notification, and the task carries on.

use std::fmt::Debug;

use anyhow::Result;
use tracing::{error, warn};

use crate::types::BuildMode;

/// Sound played with development notifications.
pub const NOTIFICATION_SOUND: &str = "Glass";

/// What the task should do after an error was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Abort,
}

/// Desktop notification sink.
pub trait Notifier: Send + Sync + Debug {
    fn notify(&self, title: &str, body: &str, sound: &str) -> Result<()>;
}

/// Notifications through the platform's notification service.
#[derive(Debug, Clone, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str, sound: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .sound_name(sound)
            .show()
            .map_err(|e| anyhow::anyhow!("showing desktop notification: {e}"))?;
        Ok(())
    }
}

/// Error policy scoped to one labelled task.
#[derive(Debug, Clone, Copy)]
pub struct ErrorInterceptor<'a> {
    label: &'a str,
    mode: BuildMode,
    notifier: &'a dyn Notifier,
}

impl<'a> ErrorInterceptor<'a> {
    pub fn new(label: &'a str, mode: BuildMode, notifier: &'a dyn Notifier) -> Self {
        Self {
            label,
            mode,
            notifier,
        }
    }

    /// The single stderr line written for a production error.
    pub fn production_line(&self, message: &str) -> String {
        format!("[{}] {}", self.label, message)
    }

    pub fn intercept(&self, message: &str) -> Verdict {
        match self.mode {
            BuildMode::Production => {
                eprintln!("{}", self.production_line(message));
                Verdict::Abort
            }
            BuildMode::Development => {
                error!(label = self.label, "{message}");
                let body = format!("Error: {message}");
                if let Err(err) = self.notifier.notify(self.label, &body, NOTIFICATION_SOUND) {
                    warn!(label = self.label, error = %err, "desktop notification failed");
                }
                Verdict::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    struct Recorder(Mutex<Vec<(String, String, String)>>);

    impl Notifier for Recorder {
        fn notify(&self, title: &str, body: &str, sound: &str) -> Result<()> {
            self.0
                .lock()
                .unwrap()
                .push((title.into(), body.into(), sound.into()));
            Ok(())
        }
    }

    #[test]
    fn production_aborts_without_notifying() {
        let rec = Recorder::default();
        let i = ErrorInterceptor::new("Error Running JS", BuildMode::Production, &rec);
        assert_eq!(i.intercept("unexpected token"), Verdict::Abort);
        assert!(rec.0.lock().unwrap().is_empty());
        assert_eq!(
            i.production_line("unexpected token"),
            "[Error Running JS] unexpected token"
        );
    }

    #[test]
    fn development_notifies_and_continues() {
        let rec = Recorder::default();
        let i = ErrorInterceptor::new("Error Running Sass", BuildMode::Development, &rec);
        assert_eq!(i.intercept("expected \";\""), Verdict::Continue);
        assert_eq!(
            rec.0.lock().unwrap().as_slice(),
            &[(
                "Error Running Sass".to_string(),
                "Error: expected \";\"".to_string(),
                "Glass".to_string()
            )]
        );
    }
}
