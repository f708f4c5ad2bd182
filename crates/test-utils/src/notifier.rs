use std::sync::{Arc, Mutex};

use sitepipe::intercept::Notifier;

/// A notification as the interceptor sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub sound: String,
}

/// Notifier that records instead of showing anything.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str, sound: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(Notification {
            title: title.to_string(),
            body: body.to_string(),
            sound: sound.to_string(),
        });
        Ok(())
    }
}
